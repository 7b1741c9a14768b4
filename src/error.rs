//! Service error taxonomy.
//!
//! Every failure surfaces as a failed outcome of the triggering operation.
//! Nothing is retried or recovered locally; the HTTP layer maps each variant
//! to a status code and the stable string from `ErrorCode`.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum KanbanError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },
    #[error("user {user_id} does not own board {board_id}")]
    Unauthorized { user_id: String, board_id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("remote failure: {0}")]
    Remote(#[source] StoreError),
}

impl From<StoreError> for KanbanError {
    fn from(err: StoreError) -> Self {
        match err {
            // Paths are built from caller-supplied ids, so a bad path is bad input.
            StoreError::InvalidPath(path) => Self::Validation(format!("invalid identifier in path {path}")),
            other => Self::Remote(other),
        }
    }
}

impl KanbanError {
    pub(crate) fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { resource, id: id.into() }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Stable machine-readable code for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for KanbanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::NotFound { .. } => "E_NOT_FOUND",
            Self::Unauthorized { .. } => "E_UNAUTHORIZED",
            Self::Validation(_) => "E_VALIDATION",
            Self::Remote(_) => "E_REMOTE",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
