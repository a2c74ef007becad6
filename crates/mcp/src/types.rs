use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Codes or fields as clients send them: `"600030.SH,000001.SZ"` or `["600030.SH", "000001.SZ"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum CodeList {
    One(String),
    Many(Vec<String>),
}

impl Default for CodeList {
    fn default() -> Self {
        CodeList::One(String::new())
    }
}

impl CodeList {
    /// Individual trimmed, non-empty entries.
    pub fn items(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            CodeList::One(value) => value.split(',').collect(),
            CodeList::Many(values) => values.iter().map(String::as_str).collect(),
        };

        raw.into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Comma-joined form the SDK expects.
    pub fn joined(&self) -> String {
        self.items().join(",")
    }

    pub fn is_blank(&self) -> bool {
        self.items().is_empty()
    }
}

impl From<&str> for CodeList {
    fn from(value: &str) -> Self {
        CodeList::One(value.to_string())
    }
}

impl From<Vec<&str>> for CodeList {
    fn from(values: Vec<&str>) -> Self {
        CodeList::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Structured failure handed back as a tool result instead of a transport fault.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "ErrorCode")]
    pub error_code: i64,
    pub error: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_code: -1,
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_string_or_list() {
        let one: CodeList = serde_json::from_value(json!("600030.SH, 000001.SZ")).unwrap();
        let many: CodeList = serde_json::from_value(json!(["600030.SH", " 000001.SZ "])).unwrap();
        assert_eq!(one.joined(), "600030.SH,000001.SZ");
        assert_eq!(many.joined(), "600030.SH,000001.SZ");
    }

    #[test]
    fn blank_entries_are_dropped() {
        assert!(CodeList::from(" , ").is_blank());
        assert!(CodeList::Many(vec![]).is_blank());
        assert_eq!(CodeList::from(vec!["close", "", "open"]).items(), vec!["close", "open"]);
    }
}
