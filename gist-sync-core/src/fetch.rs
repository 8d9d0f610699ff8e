//! Concrete [`ContentFetcher`]s: raw HTTP (GitHub-style) and local disk.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::config::SourceLocation;
use crate::contract::ContentFetcher;
use crate::error::{ConfigError, FetchError};

pub const USER_AGENT_VALUE: &str = concat!("gist-sync/", env!("CARGO_PKG_VERSION"));

/// Fetches references relative to a base URL.
///
/// The token is only sent to the base URL's origin. Absolute references to
/// other hosts are fetched anonymously.
pub struct HttpFetcher {
    client: Client,
    base: Url,
    auth: Option<HeaderValue>,
}

impl HttpFetcher {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, ConfigError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("invalid base URL `{base_url}`: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        let auth = token
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("token {}", token.trim()))
                    .map_err(|e| ConfigError::Invalid(format!("invalid token: {e}")))?;
                value.set_sensitive(true);
                Ok::<_, ConfigError>(value)
            })
            .transpose()?;
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base, auth })
    }

    /// Fetcher for `{raw_base_url}/{owner}/{repo}/{branch}/`.
    pub fn for_github(
        raw_base_url: &str,
        repo: &str,
        branch: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let base = format!(
            "{}/{}/{}/",
            raw_base_url.trim_end_matches('/'),
            repo.trim_matches('/'),
            branch
        );
        Self::new(&base, token, timeout)
    }

    /// Absolute URLs are used as-is; anything else is a path below the base,
    /// percent-encoded segment by segment.
    pub fn resolve(&self, reference: &str) -> Result<Url, FetchError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Url::parse(reference).map_err(|e| FetchError::Rejected {
                reference: reference.to_string(),
                reason: format!("invalid URL: {e}"),
            });
        }

        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| FetchError::Rejected {
                reference: reference.to_string(),
                reason: "base URL cannot carry a path".to_string(),
            })?;
            segments
                .pop_if_empty()
                .extend(reference.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn is_trusted(&self, url: &Url) -> bool {
        url.origin() == self.base.origin()
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, reference: &str) -> Result<String, FetchError> {
        let url = self.resolve(reference)?;
        debug!(%url, "Fetching content");

        let mut request = self.client.get(url.clone());
        if let Some(auth) = self.auth.as_ref().filter(|_| self.is_trusted(&url)) {
            request = request.header(AUTHORIZATION, auth.clone());
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(reference, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(reference, status));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(reference, &e))?;
        decode(reference, body.to_vec())
    }
}

/// Reads references as paths below a root directory.
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ContentFetcher for LocalFetcher {
    async fn fetch(&self, reference: &str) -> Result<String, FetchError> {
        let path = self.root.join(reference.trim_start_matches('/'));
        debug!(path = %path.display(), "Reading content from disk");

        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if meta.is_dir() {
                return Err(FetchError::Rejected {
                    reference: reference.to_string(),
                    reason: "is a directory".to_string(),
                });
            }
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound {
                reference: reference.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => FetchError::Rejected {
                reference: reference.to_string(),
                reason: e.to_string(),
            },
            _ => FetchError::Transient {
                reference: reference.to_string(),
                reason: e.to_string(),
            },
        })?;
        decode(reference, bytes)
    }
}

/// Builds the fetcher matching the configured source.
pub fn fetcher_for(
    source: &SourceLocation,
    token: &str,
    timeout: Duration,
) -> Result<Box<dyn ContentFetcher>, ConfigError> {
    match source {
        SourceLocation::Github {
            repo,
            branch,
            raw_base_url,
        } => Ok(Box::new(HttpFetcher::for_github(
            raw_base_url,
            repo,
            branch,
            Some(token),
            timeout,
        )?)),
        SourceLocation::Local { root } => Ok(Box::new(LocalFetcher::new(root.clone()))),
    }
}

pub(crate) fn classify_status(reference: &str, status: StatusCode) -> FetchError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::NotFound {
            reference: reference.to_string(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => FetchError::Transient {
            reference: reference.to_string(),
            reason: status.to_string(),
        },
        s if s.is_server_error() => FetchError::Transient {
            reference: reference.to_string(),
            reason: status.to_string(),
        },
        _ => FetchError::Rejected {
            reference: reference.to_string(),
            reason: status.to_string(),
        },
    }
}

fn transport_error(reference: &str, err: &reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::Rejected {
            reference: reference.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Transient {
            reference: reference.to_string(),
            reason: err.to_string(),
        }
    }
}

fn decode(reference: &str, bytes: Vec<u8>) -> Result<String, FetchError> {
    let content = String::from_utf8(bytes).map_err(|e| FetchError::Decode {
        reference: reference.to_string(),
        reason: e.to_string(),
    })?;
    if content.is_empty() {
        return Err(FetchError::Empty {
            reference: reference.to_string(),
        });
    }
    Ok(content)
}
