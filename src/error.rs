//! Error types.
//!
//! "Not found" and "throttled" are ordinary outcomes and have no variant
//! here.

use thiserror::Error;

/// The statistics payload could not be turned into an area tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The outer envelope is not valid JSON or has no string `data` field.
    #[error("malformed payload envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The document inside `data` is not a valid statistics payload.
    #[error("malformed statistics payload: {0}")]
    Payload(#[source] serde_json::Error),

    /// The payload decoded, but its area tree has no records.
    #[error("statistics payload contains an empty area tree")]
    EmptyAreaTree,
}

/// The upstream payload could not be fetched.
///
/// Raised by [`PayloadSource`](crate::PayloadSource) implementations, never by
/// the parsing or lookup code.
#[derive(Debug, Error)]
#[error("failed to fetch statistics: {message}")]
pub struct FetchError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FetchError {
    /// Creates a fetch error with a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fetch error wrapping the underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The description passed at construction.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Anything that can go wrong answering a city query end to end.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Fetching the payload failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Parsing the payload failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_parse_error_messages() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ParseError::Envelope(json_err);
        assert!(err.to_string().starts_with("malformed payload envelope"));
        assert!(err.source().is_some());

        assert_eq!(
            ParseError::EmptyAreaTree.to_string(),
            "statistics payload contains an empty area tree"
        );
    }

    #[test]
    fn test_fetch_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = FetchError::with_source("GET list-total", io);
        assert_eq!(err.message(), "GET list-total");
        assert_eq!(err.to_string(), "failed to fetch statistics: GET list-total");
        assert!(err.source().is_some());
        assert!(FetchError::new("offline").source().is_none());
    }

    #[test]
    fn test_query_error_is_transparent() {
        let err: QueryError = ParseError::EmptyAreaTree.into();
        assert_eq!(err.to_string(), ParseError::EmptyAreaTree.to_string());
        assert!(matches!(err, QueryError::Parse(ParseError::EmptyAreaTree)));

        let err: QueryError = FetchError::new("offline").into();
        assert!(matches!(err, QueryError::Fetch(_)));
    }
}
