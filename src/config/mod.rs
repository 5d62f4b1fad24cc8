pub mod schema;

pub use schema::{ProbeConfig, DEFAULT_PROTECTED_TOOL, DEFAULT_PUBLIC_TOOL};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default config file location (~/.utcp-probe/config.toml).
pub fn default_config_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".utcp-probe").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".utcp-probe/config.toml"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<ProbeConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ProbeConfig =
            toml::from_str(&contents).context("Failed to parse probe config (TOML)")?;
        Ok(config)
    } else {
        debug!("No config file at {}, using defaults", path.display());
        Ok(ProbeConfig::default())
    }
}

/// Load the file config (explicit path, `~` expanded, or the default
/// location) and layer the process environment on top.
pub fn load(path: Option<&str>) -> Result<ProbeConfig> {
    let path = match path {
        Some(p) => PathBuf::from(shellexpand::tilde(p).into_owned()),
        None => default_config_path(),
    };
    let mut config = load_config(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Build the shared HTTP client with the configured timeout.
pub fn http_client(config: &ProbeConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("utcp-probe/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
