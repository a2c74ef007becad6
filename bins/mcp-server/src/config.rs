use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use ::config::{Config, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use wind_mcp::TransportMode;

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub transport: TransportMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidAddr(String),
    #[error("configuration load failed: {0}")]
    Load(#[from] BuilderError),
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let target = format!("{}:{}", self.host, self.port);
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| ConfigError::InvalidAddr(target.clone()))?
            .next()
            .ok_or(ConfigError::InvalidAddr(target))
    }
}

/// Layer `config/config.yaml` (or `path`) under `WINDMCP__*` environment overrides.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = match path {
        Some(path) => builder.add_source(File::from(path).required(true)),
        None => builder.add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false)),
    };

    builder = builder.add_source(Environment::with_prefix("WINDMCP").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;

    Ok(config)
}
