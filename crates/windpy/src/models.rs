use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WindError;

/// Result object returned by every WindPy call (`w.wsd`, `w.tdays`, `w.start`, ...).
///
/// `Data` is laid out the way the SDK lays it out: one inner vector per field
/// (or per code for single-field requests), each holding one value per time point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WindData {
    pub error_code: i64,
    pub codes: Vec<String>,
    pub fields: Vec<String>,
    pub times: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl WindData {
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    pub fn first_column(&self) -> &[Value] {
        self.data.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_value(&self) -> Option<&Value> {
        self.first_column().first()
    }

    /// Human readable reason for a failed call; the SDK stores it in `Data[0][0]`.
    pub fn vendor_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        Some(match self.first_value() {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => format!("ErrorCode={}", self.error_code),
        })
    }

    pub fn ensure_success(self) -> Result<Self, WindError> {
        match self.vendor_message() {
            None => Ok(self),
            Some(message) => Err(WindError::Vendor {
                code: self.error_code,
                message,
            }),
        }
    }
}

/// One SDK query, carrying the SDK's own parameter names on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum WindCall {
    Wsd {
        codes: String,
        fields: String,
        begin_time: String,
        end_time: String,
        options: String,
    },
    Wss {
        codes: String,
        fields: String,
        options: String,
    },
    Wses {
        codes: String,
        fields: String,
        begin_time: String,
        end_time: String,
        options: String,
    },
    Wsq {
        codes: String,
        fields: String,
        options: String,
    },
    Tdays {
        begin_time: String,
        end_time: String,
        options: String,
    },
    TdaysOffset {
        offset: i64,
        begin_time: String,
        options: String,
    },
    TdaysCount {
        begin_time: String,
        end_time: String,
        options: String,
    },
}

impl WindCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            WindCall::Wsd { .. } => "wsd",
            WindCall::Wss { .. } => "wss",
            WindCall::Wses { .. } => "wses",
            WindCall::Wsq { .. } => "wsq",
            WindCall::Tdays { .. } => "tdays",
            WindCall::TdaysOffset { .. } => "tdaysoffset",
            WindCall::TdaysCount { .. } => "tdayscount",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedResponse {
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub wait_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_uses_sdk_parameter_names() {
        let call = WindCall::TdaysOffset {
            offset: -10,
            begin_time: "20240101".into(),
            options: "Days=Trading".into(),
        };
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({
                "function": "tdaysoffset",
                "offset": -10,
                "beginTime": "20240101",
                "options": "Days=Trading"
            })
        );
        assert_eq!(call.function_name(), "tdaysoffset");
    }

    #[test]
    fn missing_result_fields_default() {
        let data: WindData = serde_json::from_value(json!({"ErrorCode": 0})).unwrap();
        assert!(data.is_success());
        assert!(data.first_value().is_none());
        assert!(data.times.is_empty());
    }

    #[test]
    fn vendor_failure_carries_message() {
        let data: WindData = serde_json::from_value(json!({
            "ErrorCode": -40520007,
            "Data": [["CWSDService: No data."]]
        }))
        .unwrap();

        match data.ensure_success() {
            Err(WindError::Vendor { code, message }) => {
                assert_eq!(code, -40520007);
                assert_eq!(message, "CWSDService: No data.");
            }
            other => panic!("expected vendor error, got {other:?}"),
        }
    }
}
