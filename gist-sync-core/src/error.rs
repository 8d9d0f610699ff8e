//! Error taxonomy.
//!
//! Per-document failures ([`ValidationError`], [`FetchError`], [`RemoteError`],
//! integrity violations) are folded into [`ItemError`] and recorded in the
//! report. Only [`SyncError`] aborts a run.

use thiserror::Error;

/// A manifest record that cannot become a [`crate::document::Document`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is malformed: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("date `{value}` does not match format `{format}`")]
    InvalidDate { value: String, format: String },
}

/// Coarse failure class of a [`FetchError`], used for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NotFound,
    Empty,
    Transient,
    TransientExhausted,
    Decode,
    Rejected,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::NotFound => "not-found",
            FetchErrorKind::Empty => "empty",
            FetchErrorKind::Transient => "transient",
            FetchErrorKind::TransientExhausted => "transient-exhausted",
            FetchErrorKind::Decode => "decode",
            FetchErrorKind::Rejected => "rejected",
        }
    }
}

/// Failure to resolve a reference to textual content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{reference}: not found")]
    NotFound { reference: String },

    #[error("{reference}: content is empty")]
    Empty { reference: String },

    #[error("{reference}: transient failure: {reason}")]
    Transient { reference: String, reason: String },

    #[error("{reference}: gave up after {attempts} attempts: {reason}")]
    Exhausted {
        reference: String,
        attempts: u32,
        reason: String,
    },

    #[error("{reference}: content is not valid UTF-8: {reason}")]
    Decode { reference: String, reason: String },

    #[error("{reference}: rejected: {reason}")]
    Rejected { reference: String, reason: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::NotFound { .. } => FetchErrorKind::NotFound,
            FetchError::Empty { .. } => FetchErrorKind::Empty,
            FetchError::Transient { .. } => FetchErrorKind::Transient,
            FetchError::Exhausted { .. } => FetchErrorKind::TransientExhausted,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
            FetchError::Rejected { .. } => FetchErrorKind::Rejected,
        }
    }

    /// Only transient failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// The remote store rejected or failed a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response from remote store: {0}")]
    Decode(String),
}

/// Problems with the run configuration. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("missing configuration value `{0}`")]
    MissingField(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The manifest could not be obtained or is not a list of records. Always fatal.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to parse manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest must be a JSON array of records")]
    NotAnArray,
}

/// Why a single document ended in the Failed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("fetch error ({kind}): {0}", kind = .0.kind().as_str())]
    Fetch(#[from] FetchError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("integrity error: key `{key}` already used by record #{first_position} ({first_title}) with different content")]
    Integrity {
        key: String,
        first_position: usize,
        first_title: String,
    },
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Validation(_) => "validation",
            ItemError::Fetch(e) => e.kind().as_str(),
            ItemError::Remote(_) => "remote",
            ItemError::Integrity { .. } => "integrity",
        }
    }
}

/// Conditions that make the whole run meaningless.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to build remote index: {0}")]
    Index(#[source] RemoteError),
}
