use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::server::WindMcpServer;

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    #[default]
    StreamableHttp,
    Sse,
    Stdio,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::StreamableHttp => "streamable-http",
            TransportMode::Sse => "sse",
            TransportMode::Stdio => "stdio",
        }
    }

    /// Mount point of the MCP endpoint for the HTTP modes.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            TransportMode::StreamableHttp => Some("/mcp"),
            TransportMode::Sse => Some("/sse"),
            TransportMode::Stdio => None,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "streamable-http" | "streamable_http" | "http" => Ok(TransportMode::StreamableHttp),
            "sse" => Ok(TransportMode::Sse),
            "stdio" => Ok(TransportMode::Stdio),
            other => Err(format!(
                "unsupported transport `{other}`, expected streamable-http, sse or stdio"
            )),
        }
    }
}

/// Router carrying the MCP endpoint plus the `/docs` and `/health` pages.
pub fn http_router(server: WindMcpServer, mode: TransportMode) -> Router {
    let config = StreamableHttpServerConfig {
        sse_keep_alive: Some(SSE_KEEP_ALIVE),
        stateful_mode: true,
        ..Default::default()
    };

    let factory = server.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(factory.clone()),
        LocalSessionManager::default().into(),
        config,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest_service(mode.endpoint().unwrap_or("/mcp"), mcp_service)
        .route("/docs", get(docs_page))
        .route("/health", get(health_check))
        .with_state(server)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve_http<F>(
    server: WindMcpServer,
    mode: TransportMode,
    addr: SocketAddr,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = http_router(server, mode);
    let listener = TcpListener::bind(addr).await?;
    let endpoint = mode.endpoint().unwrap_or("/mcp");

    info!(%addr, transport = %mode, "Wind MCP 服务监听 http://{addr}{endpoint}");
    info!("接口文档: http://{addr}/docs");
    info!("健康检查: http://{addr}/health");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Wind MCP HTTP 服务已关闭");
    Ok(())
}

async fn health_check(State(server): State<WindMcpServer>) -> Response {
    match server.session().is_connected().await {
        Ok(connected) => Json(json!({
            "status": "ok",
            "wind_connected": connected,
            "server_version": env!("CARGO_PKG_VERSION"),
            "tools": server.tool_names(),
        }))
        .into_response(),
        Err(err) => {
            error!(error = %err, "健康检查失败");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn docs_page(State(server): State<WindMcpServer>) -> Html<String> {
    let runtime = server.runtime();
    let endpoint = runtime.transport.endpoint().unwrap_or("/mcp");

    let mut rows = String::new();
    for tool in server.tools() {
        let description = tool
            .description
            .as_deref()
            .map(escape_html)
            .unwrap_or_default();
        rows.push_str(&format!(
            "<tr><td><code>{}</code></td><td>{}</td></tr>\n",
            escape_html(&tool.name),
            description
        ));
    }

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head><meta charset=\"utf-8\"><title>Wind MCP Server</title></head>\n<body>\n\
         <h1>Wind MCP Server {version}</h1>\n\
         <p>传输方式: <code>{transport}</code></p>\n\
         <ul>\n<li>MCP: <code>{endpoint}</code></li>\n<li>健康检查: <code>/health</code></li>\n<li>文档: <code>/docs</code></li>\n</ul>\n\
         <h2>工具</h2>\n<table>\n<tr><th>名称</th><th>说明</th></tr>\n{rows}</table>\n\
         </body>\n</html>\n",
        version = env!("CARGO_PKG_VERSION"),
        transport = runtime.transport,
    ))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
