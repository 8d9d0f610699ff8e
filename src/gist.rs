//! GitHub Gists as a [`RemoteStore`].
//!
//! Listing walks `GET /gists` page by page, then reads every described gist in
//! detail to get its content. The first file (by name) is the entry's file;
//! when GitHub truncates it the full text is fetched from its `raw_url`.
//! Writes are `POST /gists` and `PATCH /gists/{id}` and are never retried.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use gist_sync_core::config::{Credentials, StoreSettings};
use gist_sync_core::contract::{EntryDraft, RemoteEntry, RemoteStore};
use gist_sync_core::error::{ConfigError, RemoteError};
use gist_sync_core::fetch::USER_AGENT_VALUE;

const PER_PAGE: usize = 100;
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

pub struct GistClient {
    client: Client,
    api_base: String,
    public: bool,
}

impl GistClient {
    pub fn new(
        settings: &StoreSettings,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let auth = format!("token {}", credentials.token().trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| ConfigError::Invalid(format!("invalid token: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build gist client: {e}")))?;

        info!(
            api_base_url = %settings.api_base_url,
            public = settings.public,
            "Initialised GistClient"
        );
        Ok(Self {
            client,
            api_base: settings.api_base_url.trim_end_matches('/').to_string(),
            public: settings.public,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(RemoteError::Api {
            status: status.as_u16(),
            message: api_message(&message),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn list_page(&self, page: usize) -> Result<Vec<GistSummary>, RemoteError> {
        let request = self
            .client
            .get(self.url("gists"))
            .query(&[("per_page", PER_PAGE), ("page", page)]);
        self.send_json(request).await
    }

    async fn read_entry(&self, summary: &GistSummary) -> Result<RemoteEntry, RemoteError> {
        let detail: GistDetail = self
            .send_json(self.client.get(self.url(&format!("gists/{}", summary.id))))
            .await?;

        let Some((name, file)) = detail.files.into_iter().next() else {
            debug!(gist_id = %detail.id, "Gist has no files");
            return Ok(RemoteEntry {
                entry_id: detail.id,
                description: detail.description.unwrap_or_default(),
                filename: String::new(),
                content: String::new(),
            });
        };

        let content = match (file.content, file.truncated, file.raw_url) {
            (Some(content), false, _) => content,
            (_, _, Some(raw_url)) => {
                debug!(gist_id = %detail.id, file = %name, "Reading full gist content from raw_url");
                self.send(self.client.get(raw_url))
                    .await?
                    .text()
                    .await
                    .map_err(|e| RemoteError::Decode(e.to_string()))?
            }
            (content, _, None) => content.unwrap_or_default(),
        };

        Ok(RemoteEntry {
            entry_id: detail.id,
            description: detail.description.unwrap_or_default(),
            filename: file.filename.unwrap_or(name),
            content,
        })
    }
}

#[async_trait]
impl RemoteStore for GistClient {
    async fn list_entries(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut entries = Vec::new();
        let mut page = 1;
        loop {
            let summaries = self.list_page(page).await.map_err(|e| {
                error!(page, error = %e, "Failed to list gists");
                e
            })?;
            let last_page = summaries.len() < PER_PAGE;

            for summary in summaries.iter().filter(|s| s.is_described()) {
                entries.push(self.read_entry(summary).await?);
            }
            if last_page {
                break;
            }
            page += 1;
        }
        info!(entries = entries.len(), pages = page, "Listed gists");
        Ok(entries)
    }

    async fn create_entry(&self, draft: &EntryDraft) -> Result<String, RemoteError> {
        let body = GistWrite::new(draft, Some(self.public));
        let created: GistCreated = self
            .send_json(self.client.post(self.url("gists")).json(&body))
            .await
            .map_err(|e| {
                error!(description = %draft.description, error = %e, "Failed to create gist");
                e
            })?;
        info!(gist_id = %created.id, description = %draft.description, "Created gist");
        Ok(created.id)
    }

    async fn update_entry(&self, entry_id: &str, draft: &EntryDraft) -> Result<(), RemoteError> {
        let body = GistWrite::new(draft, None);
        self.send(
            self.client
                .patch(self.url(&format!("gists/{entry_id}")))
                .json(&body),
        )
        .await
        .map_err(|e| {
            error!(gist_id = entry_id, error = %e, "Failed to update gist");
            e
        })?;
        info!(gist_id = entry_id, description = %draft.description, "Updated gist");
        Ok(())
    }
}

/// Pulls `message` out of a GitHub error body, falling back to the raw text.
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: String,
    }
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct GistSummary {
    id: String,
    #[serde(default)]
    description: Option<String>,
}

impl GistSummary {
    fn is_described(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct GistDetail {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistCreated {
    id: String,
}

#[derive(Debug, Serialize)]
struct GistWrite<'a> {
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    public: Option<bool>,
    files: BTreeMap<&'a str, FileBody<'a>>,
}

#[derive(Debug, Serialize)]
struct FileBody<'a> {
    content: &'a str,
}

impl<'a> GistWrite<'a> {
    fn new(draft: &'a EntryDraft, public: Option<bool>) -> Self {
        let mut files = BTreeMap::new();
        files.insert(
            draft.filename.as_str(),
            FileBody {
                content: &draft.content,
            },
        );
        Self {
            description: &draft.description,
            public,
            files,
        }
    }
}
