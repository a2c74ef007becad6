use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;
use wind_core::config::{AppConfig, WindBridgeConfig};

use crate::api::WindApi;
use crate::error::WindError;
use crate::models::{ConnectedResponse, StartRequest, WindCall, WindData};

/// HTTP client for the Windows-side bridge that owns the real WindPy session.
#[derive(Debug, Clone)]
pub struct WindBridgeClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    start_wait_secs: u64,
}

impl WindBridgeClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let bridge = config.require_wind_bridge()?;
        Ok(Self::new(bridge)?)
    }

    pub fn new(bridge: &WindBridgeConfig) -> Result<Self, WindError> {
        // start() blocks on the terminal login, so it gets its own budget on top
        // of the regular request timeout.
        let http = Client::builder()
            .user_agent("wind-mcp-gateway/0.1")
            .timeout(Duration::from_secs(
                bridge.timeout_secs + bridge.start_wait_secs,
            ))
            .build()?;

        Ok(Self {
            http,
            base_url: bridge.endpoint.trim_end_matches('/').to_string(),
            token: bridge.token.clone(),
            start_wait_secs: bridge.start_wait_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self))]
    pub async fn query(&self, call: &WindCall) -> Result<WindData, WindError> {
        tracing::info!(function = call.function_name(), "Wind bridge call");
        self.post("/call", Some(call)).await
    }

    async fn get<T>(&self, path: &str) -> Result<T, WindError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!("Wind bridge GET {}", path);
        let builder = self.prepare_request(Method::GET, path)?;
        self.execute(builder).await
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, WindError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("Wind bridge POST {}", path);
        let builder = self.prepare_request(Method::POST, path)?;
        let builder = match body {
            Some(payload) => builder.body(serde_json::to_vec(payload)?),
            None => builder,
        };
        self.execute(builder).await
    }

    fn prepare_request(&self, method: Method, path: &str) -> Result<RequestBuilder, WindError> {
        let url = format!("{}{}", self.base_url, path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            );
        }

        Ok(self.http.request(method, url).headers(headers))
    }

    async fn execute<T>(&self, builder: RequestBuilder) -> Result<T, WindError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(WindError::HttpStatus { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl WindApi for WindBridgeClient {
    #[instrument(skip(self))]
    async fn start(&self) -> Result<WindData, WindError> {
        let request = StartRequest {
            wait_time: self.start_wait_secs,
        };
        self.post("/start", Some(&request)).await
    }

    #[instrument(skip(self))]
    async fn stop(&self) -> Result<WindData, WindError> {
        self.post::<(), _>("/stop", None).await
    }

    async fn is_connected(&self) -> Result<bool, WindError> {
        let response: ConnectedResponse = self.get("/isconnected").await?;
        Ok(response.connected)
    }

    async fn call(&self, call: &WindCall) -> Result<WindData, WindError> {
        self.query(call).await
    }
}
