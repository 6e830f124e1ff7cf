//! # AppError
//!
//! Centralized error handling for the Rusty-Blog ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

use crate::guard::Decision;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Group, Author, Post)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Write attempted by an anonymous identity
    #[error("authentication required")]
    Unauthenticated,

    /// Write attempted by someone other than the owner
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Validation failure (e.g., blank text, unknown group in a form)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Resource already exists (e.g., duplicate group slug)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        AppError::NotFound(kind, key.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl Decision {
    /// Turns a denial into the matching error, keeping `what` for the message.
    pub fn require(self, what: &str) -> Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::DenyUnauthenticated => Err(AppError::Unauthenticated),
            Decision::DenyForbidden => Err(AppError::Forbidden(what.to_string())),
        }
    }
}

/// A specialized Result type for Rusty-Blog logic.
pub type Result<T> = std::result::Result<T, AppError>;
