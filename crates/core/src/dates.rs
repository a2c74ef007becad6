use std::fmt::{Display, Write as _};

use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime};

/// Compact date layout used for every date the gateway hands back to clients.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

const DATE_LAYOUTS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%Y.%m.%d"];
const DATETIME_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y%m%d %H:%M:%S"];

/// Format the local date and time with a strftime pattern.
///
/// Invalid patterns are reported as errors instead of panicking inside `Display`.
pub fn format_today(fmt: &str) -> Result<String> {
    format_datetime(Local::now().naive_local(), fmt)
}

pub fn format_datetime(datetime: NaiveDateTime, fmt: &str) -> Result<String> {
    let items = strftime_items(fmt)?;
    render(datetime.format_with_items(items.into_iter()), fmt)
}

pub fn format_date(date: NaiveDate, fmt: &str) -> Result<String> {
    let items = strftime_items(fmt)?;
    render(date.format_with_items(items.into_iter()), fmt)
}

fn strftime_items(fmt: &str) -> Result<Vec<Item<'_>>> {
    let items: Vec<Item<'_>> = StrftimeItems::new(fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(anyhow!("无效的日期格式: {fmt}"));
    }
    Ok(items)
}

// A date without a time part rejects %H/%M/%S here rather than in `to_string`.
fn render(value: impl Display, fmt: &str) -> Result<String> {
    let mut rendered = String::new();
    write!(rendered, "{value}").map_err(|_| anyhow!("日期格式化失败: {fmt}"))?;
    Ok(rendered)
}

/// Parse the date layouts the Wind bridge is known to emit.
pub fn parse_wind_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, layout) {
            return Some(date);
        }
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(datetime.date());
        }
    }

    chrono::DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Render a bridge date as `YYYYMMDD`, leaving anything unrecognised untouched.
pub fn normalize_wind_date(raw: &str) -> String {
    match parse_wind_date(raw) {
        Some(date) => date.format(COMPACT_DATE_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_layouts() {
        assert_eq!(normalize_wind_date("2024-01-02"), "20240102");
        assert_eq!(normalize_wind_date("20240102"), "20240102");
        assert_eq!(normalize_wind_date("2024/01/02"), "20240102");
        assert_eq!(normalize_wind_date("2024-01-02T00:00:00"), "20240102");
        assert_eq!(normalize_wind_date("2024-01-02 00:00:00.005"), "20240102");
        assert_eq!(normalize_wind_date("2024-01-02T00:00:00+08:00"), "20240102");
    }

    #[test]
    fn keeps_unrecognised_values() {
        assert_eq!(normalize_wind_date("-5TD"), "-5TD");
        assert_eq!(normalize_wind_date(""), "");
    }

    #[test]
    fn formats_with_custom_pattern() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        assert_eq!(format_date(date, "%Y%m%d").unwrap(), "20240604");
        assert_eq!(format_date(date, "%Y-%m-%d").unwrap(), "2024-06-04");
    }

    #[test]
    fn formats_time_of_day() {
        let datetime = NaiveDate::from_ymd_opt(2024, 6, 4)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        assert_eq!(
            format_datetime(datetime, "%Y-%m-%d %H:%M:%S").unwrap(),
            "2024-06-04 09:30:05"
        );
    }

    #[test]
    fn today_accepts_time_codes() {
        let now = format_today("%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(now.len(), 19);
        assert!(NaiveDateTime::parse_from_str(&now, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        assert!(format_date(date, "%Q").is_err());
    }
}
