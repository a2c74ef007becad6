use rmcp::schemars;
use serde::Deserialize;
use tracing::warn;
use windpy::{WindCall, WindData, WindError};

use crate::reference::convert_indicators;
use crate::session::WindSession;
use crate::types::CodeList;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WsdRequest {
    #[schemars(description = "证券代码，字符串或字符串列表，如 \"600030.SH\" 或 [\"600010.SH\",\"000001.SZ\"]")]
    pub codes: CodeList,
    #[schemars(description = "指标，字符串或字符串列表，如 \"CLOSE,HIGH\"；支持中文常用指标名")]
    pub fields: CodeList,
    #[serde(rename = "beginTime")]
    #[schemars(description = "起始日期，如 \"2016-01-01\"、\"20160101\"、\"-5D\"")]
    pub begin_time: String,
    #[serde(rename = "endTime")]
    #[schemars(description = "截止日期，如 \"2016-01-05\"、\"20160105\"、\"-2D\"")]
    pub end_time: String,
    #[serde(default)]
    #[schemars(description = "以分号分隔的可选参数，如 \"Period=W;Days=Trading\"")]
    pub options: String,
}

impl WsdRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::Wsd {
            codes: require_codes(&self.codes)?,
            fields: require_fields(&self.fields)?,
            begin_time: require_date("beginTime", &self.begin_time)?,
            end_time: require_date("endTime", &self.end_time)?,
            options: self.options.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WssRequest {
    #[schemars(description = "证券代码，字符串或字符串列表")]
    pub codes: CodeList,
    #[schemars(description = "指标，支持多指标")]
    pub fields: CodeList,
    #[serde(default)]
    #[schemars(description = "以分号分隔的可选参数，如 \"tradeDate=20180611\"")]
    pub options: String,
}

impl WssRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::Wss {
            codes: require_codes(&self.codes)?,
            fields: require_fields(&self.fields)?,
            options: self.options.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WsesRequest {
    #[schemars(description = "板块 ID，字符串或字符串列表，如 \"a001010200000000\"")]
    pub codes: CodeList,
    #[schemars(description = "仅支持单指标，如 \"sec_close_avg\"")]
    pub fields: CodeList,
    #[serde(rename = "beginTime")]
    pub begin_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(default)]
    pub options: String,
}

impl WsesRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::Wses {
            codes: require_codes(&self.codes)?,
            fields: require_fields(&self.fields)?,
            begin_time: require_date("beginTime", &self.begin_time)?,
            end_time: require_date("endTime", &self.end_time)?,
            options: self.options.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct WsqRequest {
    #[schemars(description = "证券代码，字符串或字符串列表，如 \"000001.SH\"")]
    pub codes: CodeList,
    #[schemars(description = "实时指标，如 \"rt_last,rt_pct_chg\"")]
    pub fields: CodeList,
    #[serde(default)]
    pub options: String,
}

impl WsqRequest {
    pub fn to_call(&self) -> Result<WindCall, WindError> {
        Ok(WindCall::Wsq {
            codes: require_codes(&self.codes)?,
            fields: require_fields(&self.fields)?,
            options: self.options.trim().to_string(),
        })
    }
}

/// Run a tabular query and hand back the SDK result object as is.
pub async fn fetch_table(session: &WindSession, call: &WindCall) -> Result<WindData, WindError> {
    let data = session.query(call).await?;

    if let Some(message) = data.vendor_message() {
        warn!(
            function = call.function_name(),
            code = data.error_code,
            %message,
            "Wind 查询返回错误码"
        );
    }

    Ok(data)
}

fn require_codes(codes: &CodeList) -> Result<String, WindError> {
    if codes.is_blank() {
        return Err(WindError::InvalidArgument("codes 不能为空".into()));
    }
    Ok(codes.joined())
}

fn require_fields(fields: &CodeList) -> Result<String, WindError> {
    if fields.is_blank() {
        return Err(WindError::InvalidArgument("fields 不能为空".into()));
    }
    Ok(convert_indicators(fields))
}

pub(crate) fn require_date(label: &str, value: &str) -> Result<String, WindError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WindError::InvalidArgument(format!("{label} 不能为空")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wsd_request_maps_to_sdk_call() {
        let request: WsdRequest = serde_json::from_value(json!({
            "codes": ["600000.SH", "000001.SZ"],
            "fields": "收盘价",
            "beginTime": "20240101",
            "endTime": "20240131"
        }))
        .unwrap();

        assert_eq!(
            request.to_call().unwrap(),
            WindCall::Wsd {
                codes: "600000.SH,000001.SZ".into(),
                fields: "close".into(),
                begin_time: "20240101".into(),
                end_time: "20240131".into(),
                options: String::new(),
            }
        );
    }

    #[test]
    fn blank_codes_are_rejected() {
        let request = WssRequest {
            codes: CodeList::from("  "),
            fields: CodeList::from("sec_name"),
            options: String::new(),
        };
        assert!(matches!(
            request.to_call(),
            Err(WindError::InvalidArgument(_))
        ));
    }

    #[test]
    fn blank_dates_are_rejected() {
        let request = WsesRequest {
            codes: CodeList::from("a001010200000000"),
            fields: CodeList::from("sec_close_avg"),
            begin_time: "2018-08-21".into(),
            end_time: " ".into(),
            options: String::new(),
        };
        let err = request.to_call().unwrap_err();
        assert!(err.to_string().contains("endTime"));
    }
}
