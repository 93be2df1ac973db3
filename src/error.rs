//! Error types for the progression engine.
//!
//! Errors are classified by what the route layer should do with them:
//! - Conflict: idempotence guards fired — expected control flow, surface as
//!   a user-facing message, never a 5xx
//! - Client: bad or unauthorized references (missing item, wrong owner)
//! - Fault: storage-layer failures
//!
//! No error here is fatal to the process. A failure aborts the single
//! logical transaction and leaves every ledger unchanged.

use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced by engine and service operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{resource} is not accessible to user {user_id}")]
    Forbidden { resource: String, user_id: String },

    #[error("Goal {0} has already been completed")]
    AlreadyCompleted(String),

    #[error("Habit {0} has already been completed today")]
    AlreadyCompletedToday(String),

    #[error("No completion to undo for item {0}")]
    NothingToUndo(String),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl EngineError {
    /// Returns true for idempotence-guard outcomes the caller should treat
    /// as a normal "already done" message rather than a failure.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::AlreadyCompleted(_) | EngineError::AlreadyCompletedToday(_)
        )
    }

    /// Returns true when the fault is in the storage layer rather than the
    /// request. Everything else maps to a 4xx-equivalent response.
    pub fn is_fault(&self) -> bool {
        matches!(self, EngineError::Db(_))
    }

    /// A short message safe to show directly to the acting user.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::NotFound(_) => "That item could not be found.".to_string(),
            EngineError::Forbidden { .. } => "You don't have access to that item.".to_string(),
            EngineError::AlreadyCompleted(_) => "This goal is already done.".to_string(),
            EngineError::AlreadyCompletedToday(_) => {
                "Already completed today — come back tomorrow.".to_string()
            }
            EngineError::NothingToUndo(_) => "There's nothing to undo.".to_string(),
            EngineError::Db(_) => "Something went wrong saving your progress.".to_string(),
        }
    }
}

/// Serializable error representation for the route layer.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    pub kind: ErrorKind,
    pub user_message: String,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Fault,
}

impl From<&EngineError> for ApiError {
    fn from(err: &EngineError) -> Self {
        let kind = match err {
            EngineError::NotFound(_) | EngineError::NothingToUndo(_) => ErrorKind::NotFound,
            EngineError::Forbidden { .. } => ErrorKind::Forbidden,
            _ if err.is_conflict() => ErrorKind::Conflict,
            _ => ErrorKind::Fault,
        };

        ApiError {
            message: err.to_string(),
            kind,
            user_message: err.user_message(),
        }
    }
}
