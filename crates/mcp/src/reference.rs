use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::types::CodeList;

const EMBEDDED_DOC: &str = include_str!("../assets/windpy_reference.md");
const NO_MATCH: &str = "未找到相关内容。请尝试更换关键词。";
const CONTEXT_BEFORE: usize = 2;
const CONTEXT_AFTER: usize = 2;

/// Chinese display names accepted in place of Wind field codes.
pub const COMMON_INDICATORS: &[(&str, &str)] = &[
    ("收盘价", "close"),
    ("涨跌幅", "pct_chg"),
    ("换手率", "turn"),
    ("每股收益EPS-基本", "eps_basic"),
    ("净资产收益率ROE-平均", "roe_avg"),
    ("开盘价", "open"),
    ("最高价", "high"),
    ("最低价", "low"),
    ("成交量", "volume"),
    ("成交额", "amt"),
    ("总市值", "mkt_cap"),
    ("流通市值", "mkt_cap_float"),
    ("市盈率TTM", "pe_ttm"),
    ("市净率", "pb_lf"),
    ("股息率TTM", "dividendyield2"),
    ("振幅", "swing"),
    ("涨停价", "up_limit"),
    ("跌停价", "down_limit"),
];

pub fn common_indicators() -> BTreeMap<&'static str, &'static str> {
    COMMON_INDICATORS.iter().copied().collect()
}

fn indicator_code(name: &str) -> &str {
    COMMON_INDICATORS
        .iter()
        .find(|(cn, _)| *cn == name)
        .map(|(_, code)| *code)
        .unwrap_or(name)
}

/// Map Chinese indicator names to Wind codes; unknown names pass through.
pub fn convert_indicators(fields: &CodeList) -> String {
    fields
        .items()
        .iter()
        .map(|item| indicator_code(item))
        .collect::<Vec<_>>()
        .join(",")
}

static DATE_FUNCTIONS: Lazy<Value> = Lazy::new(|| {
    json!({
        "tdays": {
            "name": "获取区间内日期序列",
            "description": "获取指定时间区间内的日期序列",
            "usage": "w.tdays(beginTime, endTime, options)",
            "example": "w.tdays('2023-01-01', '2023-12-31', 'Days=Trading;TradingCalendar=SSE')"
        },
        "tdaysoffset": {
            "name": "日期偏移函数",
            "description": "根据基准日期计算偏移后的日期",
            "usage": "w.tdaysoffset(offset, beginTime, options)",
            "example": "w.tdaysoffset(-20, '2023-01-01', 'Days=Trading')"
        },
        "tdayscount": {
            "name": "日期计数函数",
            "description": "计算指定区间内的日期数量",
            "usage": "w.tdayscount(beginTime, endTime, options)",
            "example": "w.tdayscount('2023-01-01', '2023-12-31', 'Days=Trading')"
        }
    })
});

static DATE_PARAMS: Lazy<Value> = Lazy::new(|| {
    json!({
        "Days": {
            "description": "日期类型",
            "options": {"Trading": "交易日", "Weekdays": "工作日", "Alldays": "日历日"},
            "default": "Trading"
        },
        "Period": {
            "description": "周期类型",
            "options": {"D": "天", "W": "周", "M": "月", "Q": "季度", "S": "半年", "Y": "年"},
            "default": "D"
        },
        "TradingCalendar": {
            "description": "交易所日历",
            "options": {
                "SSE": "上海证券交易所",
                "SZSE": "深圳证券交易所",
                "CFFE": "中金所",
                "TWSE": "台湾证券交易所",
                "DCE": "大商所",
                "NYSE": "纽约证券交易所",
                "CZCE": "郑商所",
                "COMEX": "纽约金属交易所",
                "SHFE": "上期所",
                "NYBOT": "纽约期货交易所",
                "HKEX": "香港交易所",
                "CME": "芝加哥商业交易所",
                "Nasdaq": "纳斯达克证券交易所",
                "NYMEX": "纽约商品交易所",
                "CBOT": "芝加哥商品交易所",
                "LME": "伦敦金属交易所",
                "IPE": "伦敦国际石油交易所"
            },
            "default": "SSE"
        }
    })
});

static DATE_MACROS: Lazy<Value> = Lazy::new(|| {
    json!({
        "relative_dates": {
            "description": "相对日期表达式，格式：[-]N[单位]",
            "examples": [
                "-5D (前推5个日历日)",
                "-10TD (前推10个交易日)",
                "-1M (前推1个月)",
                "-2Q (前推2个季度)",
                "-1Y (前推1年)"
            ],
            "units": {
                "TD": "交易日", "D": "日历日", "W": "周", "M": "月",
                "Q": "季度", "S": "半年", "Y": "年"
            }
        },
        "special_macros": {
            "time_points": {
                "ED": "截止日期", "SD": "开始日期",
                "LQ1": "去年一季", "LQ2": "去年二季", "LQ3": "去年三季", "LYR": "去年年报",
                "RQ1": "今年一季", "RQ2": "今年二季", "RQ3": "今年三季", "MRQ": "最新一期",
                "RYF": "本年初", "RHYF": "下半年初", "RMF": "本月初", "RWF": "本周一",
                "LWE": "上周末", "LME": "上月末", "LHYE": "上半年末", "LYE": "上年末",
                "IPO": "上市首日"
            },
            "examples": ["ED-1Y (一年前)", "IPO (上市首日)", "RYF (本年初)", "LYE (上年末)"]
        }
    })
});

/// Date-function reference, either complete or for a single function.
pub fn date_functions(function_name: Option<&str>) -> Value {
    let Some(name) = function_name.map(str::trim).filter(|name| !name.is_empty()) else {
        return json!({
            "functions": DATE_FUNCTIONS.clone(),
            "params": DATE_PARAMS.clone(),
            "date_macros": DATE_MACROS.clone(),
        });
    };

    let key = name.to_lowercase();
    match DATE_FUNCTIONS.get(&key) {
        Some(function) => json!({ "function": function }),
        None => {
            let available: Vec<&String> = DATE_FUNCTIONS
                .as_object()
                .map(|functions| functions.keys().collect())
                .unwrap_or_default();
            json!({
                "error": format!("未找到日期函数: {name}"),
                "available": available,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocSearchResult {
    #[serde(rename = "match")]
    pub summary: String,
    pub matches: Vec<String>,
}

/// The WindPy reference text served by `search_windpy_doc` and `resource://windpy-doc`.
#[derive(Debug, Clone)]
pub struct ReferenceDoc {
    text: String,
}

impl Default for ReferenceDoc {
    fn default() -> Self {
        Self::embedded()
    }
}

impl ReferenceDoc {
    pub fn embedded() -> Self {
        Self {
            text: EMBEDDED_DOC.to_string(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load an on-disk override, falling back to the embedded copy.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::embedded();
        };

        match fs::read_to_string(path) {
            Ok(text) => Self { text },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "读取 WindPy 文档失败，使用内置文档");
                Self::embedded()
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Case-insensitive line search returning each hit with surrounding context.
    pub fn search(&self, query: &str) -> DocSearchResult {
        let needle = query.trim().to_lowercase();
        let lines: Vec<&str> = self.text.lines().collect();

        let matches: Vec<String> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !needle.is_empty() && line.to_lowercase().contains(&needle))
            .map(|(index, _)| {
                let start = index.saturating_sub(CONTEXT_BEFORE);
                let end = (index + CONTEXT_AFTER + 1).min(lines.len());
                lines[start..end].join("\n")
            })
            .collect();

        let summary = if matches.is_empty() {
            NO_MATCH.to_string()
        } else {
            matches.join("\n---\n")
        };

        DocSearchResult { summary, matches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_chinese_indicator_names() {
        assert_eq!(convert_indicators(&CodeList::from("收盘价,涨跌幅")), "close,pct_chg");
        assert_eq!(
            convert_indicators(&CodeList::from(vec!["换手率", "sec_name"])),
            "turn,sec_name"
        );
        assert_eq!(convert_indicators(&CodeList::from("CLOSE")), "CLOSE");
    }

    #[test]
    fn single_date_function_lookup_is_case_insensitive() {
        let value = date_functions(Some("TDays"));
        assert_eq!(value["function"]["usage"], "w.tdays(beginTime, endTime, options)");
    }

    #[test]
    fn unknown_date_function_lists_alternatives() {
        let value = date_functions(Some("wsd"));
        assert!(value["error"].as_str().unwrap().contains("wsd"));
        assert_eq!(value["available"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn full_date_reference_has_all_sections() {
        let value = date_functions(None);
        assert!(value["functions"].get("tdayscount").is_some());
        assert_eq!(value["params"]["Days"]["default"], "Trading");
        assert_eq!(value["date_macros"]["special_macros"]["time_points"]["LYE"], "上年末");
    }

    #[test]
    fn search_returns_context_window() {
        let doc = ReferenceDoc::from_text("a\nb\nc\nneedle here\nd\ne\nf");
        let result = doc.search("NEEDLE");
        assert_eq!(result.matches, vec!["b\nc\nneedle here\nd\ne".to_string()]);
        assert_eq!(result.summary, result.matches[0]);
    }

    #[test]
    fn search_clamps_at_document_edges() {
        let doc = ReferenceDoc::from_text("hit first\nx\ny\nz\nhit last");
        let result = doc.search("hit");
        assert_eq!(result.matches[0], "hit first\nx\ny");
        assert_eq!(result.matches[1], "y\nz\nhit last");
        assert!(result.summary.contains("\n---\n"));
    }

    #[test]
    fn search_without_hits_says_so() {
        let result = ReferenceDoc::embedded().search("definitely-not-in-the-doc");
        assert!(result.matches.is_empty());
        assert_eq!(result.summary, NO_MATCH);
    }

    #[test]
    fn query_is_trimmed_and_blank_matches_nothing() {
        let doc = ReferenceDoc::from_text("alpha\nbeta");
        assert_eq!(doc.search("  beta ").matches, vec!["alpha\nbeta".to_string()]);
        assert!(doc.search("   ").matches.is_empty());
        assert!(doc.search("").matches.is_empty());
    }

    #[test]
    fn embedded_doc_covers_wsd() {
        assert!(!ReferenceDoc::embedded().search("w.wsd").matches.is_empty());
    }
}
