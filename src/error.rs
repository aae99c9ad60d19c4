//! Error types for the status collector.

use thiserror::Error;

/// Registry document errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to parse registry document: {0}")]
    Parse(String),

    #[error("Failed to serialize registry document: {0}")]
    Serialize(String),
}

/// Remote repository errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{operation}: unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Remote call cancelled")]
    Cancelled,
}

/// Reconciliation tick errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{operation}: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Wrap a remote failure with the name of the operation that produced it.
    pub fn remote(operation: &'static str, source: RemoteError) -> Self {
        match source {
            RemoteError::Cancelled => ReconcileError::Cancelled,
            source => ReconcileError::Remote { operation, source },
        }
    }

    /// Name of the remote operation that failed, if any.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ReconcileError::Remote { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// Ingestion boundary errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid JSON: {0}")]
    InvalidBody(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("Configuration error: {0}")]
    Other(String),
}

/// Watcher-side errors
#[derive(Debug, Error)]
pub enum InformerError {
    #[error("read status.conditions: {0}")]
    MalformedConditions(String),

    #[error("post status: {0}")]
    Post(String),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
}
