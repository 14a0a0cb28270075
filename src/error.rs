//! Unified error handling for the bili-comments crate
//!
//! Domain-specific errors live in [`crate::utils::error`]; this module folds
//! them into a single [`Error`] enum for code that crosses module boundaries
//! (storage, CLI), and classifies them for handling strategies.
//!
//! # Architecture
//!
//! - [`ErrorClassify`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use std::io;
use thiserror::Error;

pub use crate::utils::error::{CollectError, FetchError, ParseError};

/// Common trait for all crate error types
pub trait ErrorClassify: std::error::Error {
    /// Check if this error is transient (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, throttling)
    Network,
    /// Remote API rejected the request
    Api,
    /// Parsing and decoding errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human-readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Api => "api",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl ErrorClassify for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::GateClosed => true,
            Self::ServerError(status) => matches!(status, 412 | 429 | 500 | 502 | 503 | 504),
            Self::Api { .. } => true,
            Self::NotFound(_) | Self::Decode(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::ServerError(_) | Self::Timeout | Self::GateClosed => {
                ErrorCategory::Network
            }
            Self::Api { .. } | Self::NotFound(_) => ErrorCategory::Api,
            Self::Decode(_) => ErrorCategory::Parsing,
        }
    }
}

impl ErrorClassify for ParseError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl ErrorClassify for CollectError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidIdentifier(_) | Self::ResourceNotFound(_) => false,
            Self::Resolve(e) => e.is_recoverable(),
            Self::FirstPage(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIdentifier(_) => ErrorCategory::Parsing,
            Self::Resolve(e) => e.category(),
            Self::ResourceNotFound(_) => ErrorCategory::Api,
            Self::FirstPage(_) => ErrorCategory::Network,
        }
    }
}

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Collection-level errors
    #[error("Collect error: {0}")]
    Collect(#[from] CollectError),

    /// Input parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl ErrorClassify for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Collect(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Collect(e) => e.category(),
            Self::Parse(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
