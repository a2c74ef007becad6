use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rmcp::schemars;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use windpy::{WindApi, WindCall, WindData, WindError};

/// Tracks the vendor session and re-establishes it lazily on the next call.
pub struct WindSession {
    api: Arc<dyn WindApi>,
    // Serializes start/stop; `state` is only locked for short updates.
    lifecycle: Mutex<()>,
    state: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    last_start_code: Option<i64>,
    last_error: Option<String>,
    connected_since: Option<DateTime<Utc>>,
    reconnect_attempts: u64,
}

#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_start_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_since: Option<String>,
    pub reconnect_attempts: u64,
    pub checked_at: String,
}

impl WindSession {
    pub fn new(api: Arc<dyn WindApi>) -> Self {
        Self {
            api,
            lifecycle: Mutex::new(()),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Run one query, reconnecting first if the session dropped.
    #[instrument(skip(self, call), fields(function = call.function_name()))]
    pub async fn query(&self, call: &WindCall) -> Result<WindData, WindError> {
        self.ensure_connected().await?;
        self.api.call(call).await
    }

    /// Issue at most one `start` when the SDK reports no live session.
    pub async fn ensure_connected(&self) -> Result<(), WindError> {
        if self.api.is_connected().await? {
            self.mark_connected().await;
            return Ok(());
        }

        let _lifecycle = self.lifecycle.lock().await;

        // A concurrent caller may have finished reconnecting while we waited.
        if self.api.is_connected().await? {
            self.mark_connected().await;
            return Ok(());
        }

        warn!("Wind API 断开，尝试重新连接");
        {
            let mut state = self.state.lock().await;
            state.connected_since = None;
            state.reconnect_attempts += 1;
        }

        let data = match self.api.start().await {
            Ok(data) => data,
            Err(err) => {
                self.state.lock().await.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        if let Some(message) = data.vendor_message() {
            warn!(code = data.error_code, %message, "Wind API 重新连接失败");
            let mut state = self.state.lock().await;
            state.last_start_code = Some(data.error_code);
            state.last_error = Some(message);
            return Err(WindError::NotConnected);
        }

        let connected = self.api.is_connected().await?;

        let mut state = self.state.lock().await;
        state.last_start_code = Some(data.error_code);
        if !connected {
            state.last_error = Some(WindError::NotConnected.to_string());
            return Err(WindError::NotConnected);
        }

        info!("Wind API 重新连接成功");
        state.last_error = None;
        state.connected_since = Some(Utc::now());
        Ok(())
    }

    async fn mark_connected(&self) {
        let mut state = self.state.lock().await;
        state.connected_since.get_or_insert_with(Utc::now);
    }

    pub async fn is_connected(&self) -> Result<bool, WindError> {
        self.api.is_connected().await
    }

    pub async fn status(&self) -> ConnectionStatus {
        let probe = self.api.is_connected().await;
        let state = self.state.lock().await;

        let (connected, probe_error) = match probe {
            Ok(connected) => (connected, None),
            Err(err) => (false, Some(err.to_string())),
        };

        ConnectionStatus {
            connected,
            last_start_code: state.last_start_code,
            last_error: probe_error.or_else(|| state.last_error.clone()),
            connected_since: state
                .connected_since
                .filter(|_| connected)
                .map(|since| since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            reconnect_attempts: state.reconnect_attempts,
            checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Tear the vendor session down and start a fresh one.
    #[instrument(skip(self))]
    pub async fn restart(&self) -> Result<ConnectionStatus, WindError> {
        {
            let _lifecycle = self.lifecycle.lock().await;

            if let Err(err) = self.api.stop().await {
                warn!(error = %err, "Wind API 关闭旧会话失败，继续启动");
            }
            self.state.lock().await.connected_since = None;

            let data = match self.api.start().await {
                Ok(data) => data,
                Err(err) => {
                    self.state.lock().await.last_error = Some(err.to_string());
                    return Err(err);
                }
            };

            let mut state = self.state.lock().await;
            state.last_start_code = Some(data.error_code);
            state.last_error = data.vendor_message();
            if data.is_success() {
                state.connected_since = Some(Utc::now());
                info!("Wind API 会话已启动");
            } else {
                warn!(code = data.error_code, "Wind API 启动返回错误码");
            }
        }

        Ok(self.status().await)
    }

    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        match self.api.stop().await {
            Ok(_) => info!("Wind API 会话已关闭"),
            Err(err) => warn!(error = %err, "Wind API 关闭会话失败"),
        }
        self.state.lock().await.connected_since = None;
    }
}
