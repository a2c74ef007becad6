use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindError {
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("failed to deserialize bridge payload: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Wind API 未连接，请确保 Wind 终端已登录")]
    NotConnected,
    #[error("Wind API error {code}: {message}")]
    Vendor { code: i64, message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
