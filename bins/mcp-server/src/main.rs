use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use wind_core::config::CONFIG;
use wind_mcp::{serve_http, ReferenceDoc, RuntimeInfo, TransportMode, WindMcpServer, WindSession};
use windpy::WindBridgeClient;

mod config;
use config::{load_app_config, ServerConfig};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "wind-mcp-server", about = "Wind 金融数据 MCP 服务", version)]
struct Cli {
    /// 监听地址，默认 127.0.0.1
    #[arg(long)]
    host: Option<String>,
    /// 监听端口，默认 8888
    #[arg(long)]
    port: Option<u16>,
    /// streamable-http | sse | stdio
    #[arg(long)]
    transport: Option<TransportMode>,
    /// 兼容旧启动脚本，编译产物不支持热重载
    #[arg(long, default_value_t = false)]
    reload: bool,
    /// 配置文件路径，默认 config/config.yaml
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut server: ServerConfig) -> ServerConfig {
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(transport) = self.transport {
            server.transport = transport;
        }
        server
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (settings, load_error) = match load_app_config(cli.config.as_deref()) {
        Ok(settings) => (settings, None),
        Err(err) => (Default::default(), Some(err)),
    };
    let server_config = cli.apply(settings.server);

    init_tracing(server_config.transport);

    if let Some(err) = load_error {
        warn!("failed to load config: {err:?}, using defaults");
    }
    if cli.reload {
        warn!("--reload 对编译后的服务无效，已忽略");
    }

    let client = WindBridgeClient::from_config(&CONFIG).context("初始化 Wind 桥接客户端失败")?;
    info!(endpoint = client.base_url(), "Wind 桥接客户端就绪");

    let session = Arc::new(WindSession::new(Arc::new(client)));
    let reference = ReferenceDoc::load(CONFIG.windpy_doc_path.as_deref());

    let outcome = match server_config.transport {
        TransportMode::Stdio => {
            info!("使用 stdio 传输启动 Wind MCP 服务");
            let server = WindMcpServer::new(session.clone(), reference, RuntimeInfo::stdio());
            server.serve_stdio().await
        }
        mode => {
            let addr = server_config.bind_addr()?;
            let runtime = RuntimeInfo::new(
                mode,
                Some(server_config.host.clone()),
                Some(server_config.port),
            );
            let server = WindMcpServer::new(session.clone(), reference, runtime);
            serve_http(server, mode, addr, shutdown_signal()).await
        }
    };

    session.shutdown().await;
    info!("Wind MCP 服务已退出");

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "无法监听 Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(%err, "无法监听 SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("收到退出信号，正在关闭...");
}

fn init_tracing(transport: TransportMode) {
    let log_dir = std::path::Path::new("logs");
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log directory {log_dir:?}: {err}");
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(log_dir, "wind-mcp-server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    // stdout carries protocol frames in stdio mode.
    let console = match transport {
        TransportMode::Stdio => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .boxed(),
    };
    let fmt_file = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(console)
        .with(fmt_file);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from(["wind-mcp-server", "--port", "9000", "--transport", "stdio"]);
        let server = cli.apply(ServerConfig::default());

        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 9000);
        assert_eq!(server.transport, TransportMode::Stdio);
        assert!(!cli.reload);
    }

    #[test]
    fn reload_flag_is_accepted() {
        let cli = Cli::parse_from(["wind-mcp-server", "--reload", "--host", "0.0.0.0"]);
        assert!(cli.reload);
        assert_eq!(cli.apply(ServerConfig::default()).host, "0.0.0.0");
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!(Cli::try_parse_from(["wind-mcp-server", "--transport", "websocket"]).is_err());
    }
}
