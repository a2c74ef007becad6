use std::time::Instant;

use chrono::Utc;
use rmcp::model::Tool;
use serde::Serialize;
use sysinfo::System;
use tracing::info;

use crate::session::WindSession;
use crate::transport::TransportMode;

/// Facts about the running process that tools and the docs page report.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub transport: TransportMode,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub started_at: Instant,
}

impl RuntimeInfo {
    pub fn new(transport: TransportMode, host: Option<String>, port: Option<u16>) -> Self {
        Self {
            transport,
            host,
            port,
            started_at: Instant::now(),
        }
    }

    pub fn stdio() -> Self {
        Self::new(TransportMode::Stdio, None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsEnvironment {
    pub transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub status: String,
    pub timestamp: f64,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    pub version: String,
    pub pid: u32,
    pub uptime_secs: u64,
    pub wind_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_error: Option<String>,
    pub registered_tools: Vec<RegisteredTool>,
    pub tools_count: usize,
    pub environment: DiagnosticsEnvironment,
}

pub async fn collect(
    session: &WindSession,
    runtime: &RuntimeInfo,
    tools: &[Tool],
) -> DiagnosticsReport {
    let registered_tools: Vec<RegisteredTool> = tools
        .iter()
        .map(|tool| RegisteredTool {
            name: tool.name.to_string(),
            description: tool.description.as_ref().map(|text| text.to_string()),
        })
        .collect();

    let (wind_connected, wind_error) = match session.is_connected().await {
        Ok(connected) => (connected, None),
        Err(err) => (false, Some(err.to_string())),
    };

    let report = DiagnosticsReport {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        os: System::long_os_version(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pid: std::process::id(),
        uptime_secs: runtime.started_at.elapsed().as_secs(),
        wind_connected,
        wind_error,
        tools_count: registered_tools.len(),
        registered_tools,
        environment: DiagnosticsEnvironment {
            transport: runtime.transport.to_string(),
            host: runtime.host.clone(),
            port: runtime.port,
        },
    };

    info!(
        tools = report.tools_count,
        wind_connected = report.wind_connected,
        "MCP 服务诊断完成"
    );

    report
}
