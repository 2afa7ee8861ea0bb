//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! split by whether backing off and retrying can help.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait for all index operations. Use
/// [`SearchIndexError::is_transient`] to decide whether an operation may be retried.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Failed to reach the search index backend (refused, reset, timed out).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with 429 or a 5xx status.
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The backend rejected the request with a non-retryable 4xx status.
    #[error("Request rejected (status {status}): {message}")]
    RequestRejected { status: u16, message: String },

    /// A bulk request completed but some documents were not indexed.
    #[error("Bulk index error: {failed} of {total} documents failed: {message}")]
    BulkIndexError {
        failed: usize,
        total: usize,
        message: String,
        transient: bool,
    },

    /// Failed to create a search collection.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize a document for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Classify an unsuccessful HTTP status from the backend.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if is_transient_status(status) {
            Self::ServerError {
                status,
                message: message.into(),
            }
        } else {
            Self::RequestRejected {
                status,
                message: message.into(),
            }
        }
    }

    /// Whether the failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::ServerError { .. } => true,
            Self::BulkIndexError { transient, .. } => *transient,
            Self::RequestRejected { .. }
            | Self::IndexCreationError(_)
            | Self::ParseError(_)
            | Self::SerializationError(_) => false,
        }
    }
}

/// 429 and every 5xx status.
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(SearchIndexError::from_status(503, "unavailable").is_transient());
        assert!(SearchIndexError::from_status(429, "too many requests").is_transient());
        assert!(!SearchIndexError::from_status(400, "mapper_parsing_exception").is_transient());
        assert!(!SearchIndexError::from_status(404, "index_not_found_exception").is_transient());
    }

    #[test]
    fn test_connection_errors_are_transient() {
        assert!(SearchIndexError::connection("connection refused").is_transient());
        assert!(!SearchIndexError::serialization("bad float").is_transient());
    }

    #[test]
    fn test_bulk_error_follows_flag() {
        let error = SearchIndexError::BulkIndexError {
            failed: 1,
            total: 2,
            message: "es_rejected_execution_exception".to_string(),
            transient: true,
        };
        assert!(error.is_transient());
        assert_eq!(
            error.to_string(),
            "Bulk index error: 1 of 2 documents failed: es_rejected_execution_exception"
        );
    }
}
