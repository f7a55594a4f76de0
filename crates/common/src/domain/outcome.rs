use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result of every device lifecycle operation.
///
/// `Ok` is the success branch, with or without a payload. `Err` carries exactly
/// one [`OutcomeError`]. Expected failures always travel this way; nothing in the
/// lifecycle path panics or bubbles a store fault.
pub type Outcome<T = ()> = Result<T, OutcomeError>;

/// Failure class, used by presentation layers to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "Validation",
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::Unauthorized => "Unauthorized",
            ErrorCategory::Forbidden => "Forbidden",
            ErrorCategory::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure detail carried by a failed [`Outcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{code}: {message}")]
pub struct OutcomeError {
    /// Short machine-stable token, e.g. `NotFound`
    pub code: String,
    /// Human readable detail
    pub message: String,
    pub category: ErrorCategory,
}

impl OutcomeError {
    pub const INVALID_INPUT: &'static str = "InvalidInput";
    pub const INVALID_OPERATION: &'static str = "InvalidOperation";
    pub const NOT_FOUND: &'static str = "NotFound";
    pub const REPOSITORY_ERROR: &'static str = "RepositoryError";
    pub const CANCELLED: &'static str = "Cancelled";

    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category,
        }
    }

    /// Malformed or missing input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_INPUT, message, ErrorCategory::Validation)
    }

    /// Operation forbidden by the entity's current state
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_OPERATION, message, ErrorCategory::Validation)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Self::NOT_FOUND, message, ErrorCategory::NotFound)
    }

    /// Unexpected store fault. The message must not contain raw fault text.
    pub fn repository_error(message: impl Into<String>) -> Self {
        Self::new(Self::REPOSITORY_ERROR, message, ErrorCategory::Unknown)
    }

    pub fn cancelled() -> Self {
        Self::new(
            Self::CANCELLED,
            "The operation was cancelled before it completed.",
            ErrorCategory::Unknown,
        )
    }
}
