use std::time::Duration;

use crate::domain::Capability;

/// Core error type for the backup pipeline.
///
/// Adapter crates should map their specific errors into this type so the job
/// runner can classify failures consistently (validation vs fetch vs other).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pre-flight rejection. Raised before any history fetch or send.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid source channel")]
    InvalidSourceChannel,

    #[error("Invalid destination server")]
    InvalidDestinationServer,

    #[error("Invalid destination channel")]
    InvalidDestinationChannel,

    #[error("missing permissions on the destination channel: {}", format_capabilities(.0))]
    MissingCapabilities(Vec<Capability>),
}

fn format_capabilities(caps: &[Capability]) -> String {
    caps.iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a single failed send.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Transient throttling. `retry_after` is the platform-specified wait, if any.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Permanent failure for this message.
    #[error("{0}")]
    Rejected(String),
}

/// Why a job ended without producing a `MigrationResult`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("failed to fetch history: {0}")]
    Fetch(String),

    #[error("backup failed: {0}")]
    Unclassified(String),
}

impl From<Error> for AbortReason {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(v) => AbortReason::Validation(v),
            Error::Fetch(msg) => AbortReason::Fetch(msg),
            other => AbortReason::Unclassified(other.to_string()),
        }
    }
}
