//! Unified error handling for the chronometer crate
//!
//! Every store backend reports failures through [`TimerError`]. The first
//! three variants are client mistakes and map to 4xx responses; `Storage`
//! wraps anything the backend itself could not do.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chronometer::error::{ErrorCategory, TimerError};
//!
//! fn status_for(err: &TimerError) -> u16 {
//!     match err.category() {
//!         ErrorCategory::NotFound => 404,
//!         ErrorCategory::Storage => 500,
//!         _ => 400,
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A uniqueness rule was broken
    Conflict,
    /// The addressed timer does not exist
    NotFound,
    /// Malformed input
    Validation,
    /// Backend failure (I/O, database, serialization)
    Storage,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

/// Errors returned by timer store operations
#[derive(Error, Debug)]
pub enum TimerError {
    /// A timer with this pseudo already exists
    #[error("Timer with this username already exists: {0}")]
    DuplicatePseudo(String),

    /// No timer matches the given id or pseudo
    #[error("Timer not found: {0}")]
    NotFound(String),

    /// An input field failed validation
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Backend failure
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TimerError {
    pub fn duplicate(pseudo: impl Into<String>) -> Self {
        Self::DuplicatePseudo(pseudo.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage error with no underlying cause
    pub fn storage(context: impl Into<String>) -> Self {
        Self::Storage {
            context: context.into(),
            source: None,
        }
    }

    /// Create a storage error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DuplicatePseudo(_) => ErrorCategory::Conflict,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Storage,
        }
    }

    /// True for errors caused by the request rather than the backend
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage { .. })
    }
}

impl From<io::Error> for TimerError {
    fn from(err: io::Error) -> Self {
        Self::with_source("I/O failure", err)
    }
}

impl From<serde_json::Error> for TimerError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON serialization failure", err)
    }
}

impl From<rusqlite::Error> for TimerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::with_source("database failure", err)
    }
}

/// Result type alias using [`TimerError`]
pub type Result<T> = std::result::Result<T, TimerError>;
