use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use gist_sync_core::config::{
    Credentials, SourceLocation, StoreSettings, SyncConfig, DEFAULT_MANIFEST,
    DEFAULT_REQUEST_TIMEOUT,
};
use gist_sync_core::error::ConfigError;
use gist_sync_core::retry::RetryPolicy;

/// Environment variable holding the GitHub token.
pub const TOKEN_ENV: &str = "GH_TOKEN";

#[derive(Deserialize)]
struct StaticConfig {
    source: SourceLocation,
    #[serde(default = "default_manifest")]
    manifest: String,
    #[serde(default)]
    date_format: Option<String>,
    #[serde(default)]
    gist: StoreSettings,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

/// Loads a static YAML config file (no secrets) and injects the token from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {path_ref:?}"))?;

    let static_conf: StaticConfig = serde_yaml::from_str(&config_content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .context("Failed to parse config YAML")?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");

    let token = match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{TOKEN_ENV} found in env");
            token
        }
        _ => {
            error!("{TOKEN_ENV} environment variable not set");
            return Err(ConfigError::MissingCredentials(TOKEN_ENV).into());
        }
    };

    let mut config = SyncConfig::new(Credentials::new(token), static_conf.source);
    config.manifest_path = static_conf.manifest;
    config.date_format = static_conf.date_format;
    config.store = static_conf.gist;
    config.retry = static_conf.retry;
    config.request_timeout = Duration::from_secs(static_conf.request_timeout_secs);

    config.validate().map_err(|e| {
        error!(error = %e, config_path = ?path_ref, "Config failed validation");
        e
    })?;

    info!(
        manifest = %config.manifest_path,
        public = config.store.public,
        max_attempts = config.retry.max_attempts,
        "Config loaded and merged successfully"
    );
    Ok(config)
}
