use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Global configuration accessor to keep the rest of the application stateless.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    AppConfig::load_from_env().expect("failed to load configuration from environment")
});

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_START_WAIT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindBridgeConfig {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds the bridge may wait for the terminal login inside `w.start`.
    #[serde(default = "default_start_wait_secs")]
    pub start_wait_secs: u64,
}

impl Default for WindBridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bridge_endpoint(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            start_wait_secs: DEFAULT_START_WAIT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub wind_bridge: WindBridgeConfig,
    /// Optional on-disk override for the embedded WindPy reference document.
    pub windpy_doc_path: Option<PathBuf>,
}

impl AppConfig {
    /// Build configuration from well-known environment variables.
    pub fn load_from_env() -> Result<Self> {
        preload_env_files();

        let endpoint =
            env_var_non_empty("WIND_BRIDGE_ENDPOINT").unwrap_or_else(|_| default_bridge_endpoint());
        let token = env_var_non_empty("WIND_BRIDGE_TOKEN").ok();
        let timeout_secs = parse_secs("WIND_BRIDGE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let start_wait_secs = parse_secs("WIND_START_WAIT_SECS", DEFAULT_START_WAIT_SECS)?;

        let windpy_doc_path = env_var_non_empty("WINDPY_DOC_PATH").ok().map(PathBuf::from);

        Ok(Self {
            wind_bridge: WindBridgeConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                token,
                timeout_secs,
                start_wait_secs,
            },
            windpy_doc_path,
        })
    }

    /// Helper that forces a usable bridge endpoint.
    pub fn require_wind_bridge(&self) -> Result<&WindBridgeConfig> {
        let bridge = &self.wind_bridge;
        ensure!(
            bridge.endpoint.starts_with("http://") || bridge.endpoint.starts_with("https://"),
            "WIND_BRIDGE_ENDPOINT 必须是 http(s) 地址，当前值: {}",
            bridge.endpoint
        );
        ensure!(bridge.timeout_secs > 0, "WIND_BRIDGE_TIMEOUT_SECS 必须大于 0");
        Ok(bridge)
    }
}

fn parse_secs(key: &str, default: u64) -> Result<u64> {
    match env_var_non_empty(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} 不是合法的秒数: {raw}")),
        Err(_) => Ok(default),
    }
}

fn env_var_non_empty(key: &str) -> Result<String, env::VarError> {
    let value = env::var(key)?;
    if value.trim().is_empty() {
        return Err(env::VarError::NotPresent);
    }
    Ok(value)
}

fn default_bridge_endpoint() -> String {
    "http://127.0.0.1:9630".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_start_wait_secs() -> u64 {
    DEFAULT_START_WAIT_SECS
}

fn preload_env_files() {
    // 自动加载当前目录或上层目录中的 .env 文件（如果存在）
    let _ = dotenv();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join("../../.env");
    if candidate.exists() {
        let _ = dotenvy::from_path(candidate);
    }
}
