//! Error types for the comment collector
//!
//! This module defines the domain-specific error types used throughout the crate.

use thiserror::Error;

/// Errors that can occur while talking to the Bilibili API
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// API envelope carried a non-zero code
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The requested resource does not exist or its comments are unavailable
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Concurrency gate was closed before a permit was granted
    #[error("Concurrency gate closed")]
    GateClosed,
}

impl FetchError {
    /// Whether this error means the resource itself is gone (not worth retrying
    /// or paging further)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that can occur while parsing user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input holds neither a BV id nor an av id
    #[error("Cannot find a BV or av id in: {0}")]
    InvalidIdentifier(String),
}

/// Collection-level failures
///
/// Only identifier resolution and the first page can fail a collection;
/// later pages are absorbed into the report statistics.
#[derive(Error, Debug)]
pub enum CollectError {
    /// Identifier could not be parsed
    #[error(transparent)]
    InvalidIdentifier(#[from] ParseError),

    /// Video metadata lookup failed
    #[error("Failed to resolve video: {0}")]
    Resolve(#[source] FetchError),

    /// Video or its comment thread does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// First page could not be fetched, so no plan can be made
    #[error("Failed to fetch first comment page: {0}")]
    FirstPage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(FetchError::NotFound("BV1xx411c7mD".to_string()).is_not_found());
        assert!(!FetchError::ServerError(404).is_not_found());
        assert!(!FetchError::Timeout.is_not_found());
    }

    #[test]
    fn test_api_error_display() {
        let err = FetchError::Api {
            code: -412,
            message: "请求被拦截".to_string(),
        };
        assert_eq!(err.to_string(), "API error -412: 请求被拦截");
    }

    #[test]
    fn test_collect_error_from_parse_error() {
        let err: CollectError = ParseError::InvalidIdentifier("b23.tv/abc".to_string()).into();
        assert!(matches!(err, CollectError::InvalidIdentifier(_)));
        assert_eq!(err.to_string(), "Cannot find a BV or av id in: b23.tv/abc");
    }
}
