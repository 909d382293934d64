//! Error types for the resolution pipeline.

use thiserror::Error;

/// Errors fetching a remote tab page.
///
/// The resolution service reports all of these as "not found"; none of
/// them is fatal to the process.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed (DNS, connection, TLS, body read).
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// The remote answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request exceeded the configured timeout.
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// The inbound key cannot name a tab page.
    #[error("invalid tab key: {0:?}")]
    InvalidKey(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// Classify a `reqwest` failure for `url`.
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    /// Returns `true` when a later request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidKey(_) | Self::Client(_) => false,
        }
    }

    /// Returns `true` when the remote reported the page as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404 | 410, .. })
    }
}

/// Errors configuring payload extraction.
///
/// Extraction itself never fails: a missing node or unparseable payload
/// degrades to an empty tree.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
}

/// Errors building the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.test/tab/a".to_string(),
            status,
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(status(404).is_not_found());
        assert!(!status(404).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(500).is_not_found());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = FetchError::Timeout {
            url: "u".to_string(),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_invalid_key_is_permanent() {
        let err = FetchError::InvalidKey(String::new());
        assert!(!err.is_transient());
        assert!(!err.is_not_found());
    }
}
