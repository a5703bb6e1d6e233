//! Error types for the moderation records core

use std::fmt;

use thiserror::Error;

use crate::gateway::Collection;

/// Result type for backend gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Failures raised by a [`BackendGateway`](crate::gateway::BackendGateway) implementation
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused or could not serve the request
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Check if error is transient (caller may retry)
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Database(sqlx_err) => matches!(
                sqlx_err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            GatewayError::Unavailable(_) => true,
            GatewayError::Json(_) => false,
        }
    }
}

/// Which half of a document move failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Set,
    Delete,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStep::Set => f.write_str("set"),
            WriteStep::Delete => f.write_str("delete"),
        }
    }
}

/// A failed step of [`BackendGateway::transfer`](crate::gateway::BackendGateway::transfer).
///
/// Steps that completed before the failure stay applied.
#[derive(Debug, Error)]
#[error("{step} on {collection} failed: {source}")]
pub struct TransferError {
    pub step: WriteStep,
    pub collection: Collection,
    #[source]
    pub source: GatewayError,
}

#[derive(Debug, Error)]
pub enum RecordsError {
    /// Query or document read failed; never retried by the core
    #[error("Fetch failed for {collection}: {source}")]
    FetchFailure {
        collection: String,
        #[source]
        source: GatewayError,
    },

    /// Set or delete failed; earlier steps of the same action are not rolled back
    #[error("Write failed ({step}) for {collection}/{document_id}: {source}")]
    WriteFailure {
        collection: String,
        document_id: String,
        step: WriteStep,
        #[source]
        source: GatewayError,
    },

    #[error("Malformed document {collection}/{document_id}: {source}")]
    Decode {
        collection: String,
        document_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid moderation transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Cursor issued for {expected} cannot page {actual}")]
    CursorMismatch { expected: String, actual: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RecordsError {
    pub(crate) fn fetch(collection: &Collection, source: GatewayError) -> Self {
        RecordsError::FetchFailure {
            collection: collection.path(),
            source,
        }
    }

    pub(crate) fn write(
        collection: &Collection,
        document_id: &str,
        step: WriteStep,
        source: GatewayError,
    ) -> Self {
        RecordsError::WriteFailure {
            collection: collection.path(),
            document_id: document_id.to_string(),
            step,
            source,
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, RecordsError::FetchFailure { .. })
    }

    pub fn is_write_failure(&self) -> bool {
        matches!(self, RecordsError::WriteFailure { .. })
    }

    /// Check if the underlying backend error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            RecordsError::FetchFailure { source, .. } | RecordsError::WriteFailure { source, .. } => {
                source.is_transient()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordsError>;
