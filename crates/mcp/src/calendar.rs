use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wind_core::dates::normalize_wind_date;
use windpy::{WindCall, WindData, WindError};

use crate::market::require_date;
use crate::session::WindSession;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TdaysRequest {
    #[serde(rename = "beginTime")]
    #[schemars(description = "起始日期，如 \"20240101\" 或日期宏")]
    pub begin_time: String,
    #[serde(rename = "endTime")]
    #[schemars(description = "截止日期")]
    pub end_time: String,
    #[serde(default)]
    #[schemars(description = "如 \"Days=Trading;Period=D;TradingCalendar=SSE\"")]
    pub options: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TdaysOffsetRequest {
    #[schemars(description = "偏移量，大于 0 向后推，小于 0 向前推")]
    pub offset: i64,
    #[serde(rename = "beginTime")]
    #[schemars(description = "参照日期")]
    pub begin_time: String,
    #[serde(default)]
    pub options: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TdaysCountRequest {
    #[serde(rename = "beginTime")]
    pub begin_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(default)]
    pub options: String,
}

impl TdaysRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::Tdays {
            begin_time: require_date("beginTime", &self.begin_time)?,
            end_time: require_date("endTime", &self.end_time)?,
            options: self.options.trim().to_string(),
        })
    }
}

impl TdaysOffsetRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::TdaysOffset {
            offset: self.offset,
            begin_time: require_date("beginTime", &self.begin_time)?,
            options: self.options.trim().to_string(),
        })
    }
}

impl TdaysCountRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::TdaysCount {
            begin_time: require_date("beginTime", &self.begin_time)?,
            end_time: require_date("endTime", &self.end_time)?,
            options: self.options.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TradingDays {
    pub error_code: i64,
    pub trading_days: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OffsetDate {
    pub error_code: i64,
    pub offset_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DayCount {
    pub error_code: i64,
    pub count: Option<i64>,
}

impl From<WindData> for TradingDays {
    fn from(data: WindData) -> Self {
        let trading_days = if data.is_success() {
            data.first_column().iter().filter_map(date_string).collect()
        } else {
            Vec::new()
        };
        Self {
            error_code: data.error_code,
            trading_days,
        }
    }
}

impl From<WindData> for OffsetDate {
    fn from(data: WindData) -> Self {
        let offset_date = if data.is_success() {
            data.first_value().and_then(date_string)
        } else {
            None
        };
        Self {
            error_code: data.error_code,
            offset_date,
        }
    }
}

impl From<WindData> for DayCount {
    fn from(data: WindData) -> Self {
        let count = if data.is_success() {
            data.first_value().and_then(count_value)
        } else {
            None
        };
        Self {
            error_code: data.error_code,
            count,
        }
    }
}

pub async fn fetch_tdays(
    session: &WindSession,
    request: &TdaysRequest,
) -> Result<TradingDays, WindError> {
    let call = request.to_call()?;
    Ok(session.query(&call).await?.into())
}

pub async fn fetch_tdays_offset(
    session: &WindSession,
    request: &TdaysOffsetRequest,
) -> Result<OffsetDate, WindError> {
    let call = request.to_call()?;
    Ok(session.query(&call).await?.into())
}

pub async fn fetch_tdays_count(
    session: &WindSession,
    request: &TdaysCountRequest,
) -> Result<DayCount, WindError> {
    let call = request.to_call()?;
    Ok(session.query(&call).await?.into())
}

fn date_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) => Some(normalize_wind_date(raw)),
        other => Some(normalize_wind_date(&other.to_string())),
    }
}

fn count_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|count| count.round() as i64)),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wind_data(value: Value) -> WindData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn trading_days_are_compact_dates() {
        let days: TradingDays = wind_data(json!({
            "ErrorCode": 0,
            "Data": [["2024-01-02", "2024-01-03T00:00:00", 20240104]]
        }))
        .into();
        assert_eq!(days.trading_days, vec!["20240102", "20240103", "20240104"]);
        assert_eq!(
            serde_json::to_value(&days).unwrap(),
            json!({"ErrorCode": 0, "TradingDays": ["20240102", "20240103", "20240104"]})
        );
    }

    #[test]
    fn vendor_error_message_is_not_a_trading_day() {
        let days: TradingDays = wind_data(json!({
            "ErrorCode": -40522017,
            "Data": [["Invalid date range"]]
        }))
        .into();
        assert!(days.trading_days.is_empty());
        assert_eq!(days.error_code, -40522017);
    }

    #[test]
    fn offset_and_count_read_first_value() {
        let offset: OffsetDate = wind_data(json!({"ErrorCode": 0, "Data": [["2023-12-15"]]})).into();
        assert_eq!(offset.offset_date.as_deref(), Some("20231215"));

        let count: DayCount = wind_data(json!({"ErrorCode": 0, "Data": [[22.0]]})).into();
        assert_eq!(count.count, Some(22));

        let empty: DayCount = wind_data(json!({"ErrorCode": 0, "Data": []})).into();
        assert_eq!(empty.count, None);
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({"ErrorCode": 0, "Count": null})
        );
    }
}
