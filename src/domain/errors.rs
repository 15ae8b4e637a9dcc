//! Domain errors for the logsleuth investigation system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-facing errors raised before any external call is made.
///
/// Backend failures are not represented here: a rejected query is recorded
/// on its [`ExecutedQuery`](crate::domain::models::ExecutedQuery) as a
/// [`QueryError`] and never aborts an investigation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Invalid time range '{0}': expected a duration like 15m, 1h, 7d or '<start>/<end>'")]
    InvalidTimeRange(String),

    #[error("Flow investigation requires a trace id or correlation id")]
    MissingFlowIdentifier,

    #[error("Component investigation requires a target service")]
    MissingTargetService,

    #[error("Unsupported {kind} window '{value}': allowed values are {allowed}")]
    InvalidWindow {
        kind: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Unknown change category: {0}")]
    UnknownCategory(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Errors returned by a [`QueryExecutor`](crate::domain::ports::QueryExecutor).
///
/// All variants are soft failures from the investigation's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryError {
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Query timed out after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode query result: {0}")]
    Decode(String),
}

impl QueryError {
    /// Whether the backend itself rejected the query (as opposed to the
    /// request never completing).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}
