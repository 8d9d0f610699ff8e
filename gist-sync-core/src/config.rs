use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

pub const DEFAULT_MANIFEST: &str = "list.json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Where posts and the manifest are read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceLocation {
    /// A GitHub repository, read through raw.githubusercontent.com.
    Github {
        /// `owner/name`
        repo: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default = "default_raw_base_url")]
        raw_base_url: String,
    },
    /// A checkout on local disk.
    Local { root: PathBuf },
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE_URL.to_string()
}

/// Settings for the remote store client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub api_base_url: String,
    /// Visibility of newly created entries.
    pub public: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            public: true,
        }
    }
}

/// API token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything one sync run needs, validated once before any network call.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub credentials: Credentials,
    pub source: SourceLocation,
    pub manifest_path: String,
    /// Optional strftime format the manifest `time` field must match.
    pub date_format: Option<String>,
    pub store: StoreSettings,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

/// The subset of [`SyncConfig`] the reconciler consults per document.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub retry: RetryPolicy,
    pub date_format: Option<String>,
}

impl SyncConfig {
    pub fn new(credentials: Credentials, source: SourceLocation) -> Self {
        Self {
            credentials,
            source,
            manifest_path: DEFAULT_MANIFEST.to_string(),
            date_format: None,
            store: StoreSettings::default(),
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.token().trim().is_empty() {
            return Err(ConfigError::MissingCredentials("GH_TOKEN"));
        }
        if self.manifest_path.trim().is_empty() {
            return Err(ConfigError::MissingField("manifest"));
        }
        match &self.source {
            SourceLocation::Github {
                repo,
                branch,
                raw_base_url,
            } => {
                let mut parts = repo.split('/');
                let well_formed = matches!(
                    (parts.next(), parts.next(), parts.next()),
                    (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
                );
                if !well_formed {
                    return Err(ConfigError::Invalid(format!(
                        "source.repo must look like `owner/name`, got `{repo}`"
                    )));
                }
                if branch.trim().is_empty() {
                    return Err(ConfigError::MissingField("source.branch"));
                }
                if raw_base_url.trim().is_empty() {
                    return Err(ConfigError::MissingField("source.raw_base_url"));
                }
            }
            SourceLocation::Local { root } => {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::MissingField("source.root"));
                }
            }
        }
        if self.store.api_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("gist.api_base_url"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            retry: self.retry.clone(),
            date_format: self.date_format.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        match &self.source {
            SourceLocation::Github { repo, branch, .. } => info!(
                source = "github",
                repo = %repo,
                branch = %branch,
                manifest = %self.manifest_path,
                "Loaded SyncConfig"
            ),
            SourceLocation::Local { root } => info!(
                source = "local",
                root = %root.display(),
                manifest = %self.manifest_path,
                "Loaded SyncConfig"
            ),
        }
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
