//! Error types for CMS access and pagination

use std::time::Duration;

/// Result alias used by the content client and pagination layers
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while talking to the CMS or advancing a pagination
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested document does not exist in the CMS
    #[error("{doc_type} `{uid}` was not found")]
    NotFound { doc_type: String, uid: String },

    /// The request never produced a response
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request did not complete within the configured bound
    #[error("request to {url} timed out after {}s", .after.as_secs_f64())]
    Timeout { url: String, after: Duration },

    /// The CMS answered with a non-success status
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The response body was not a valid API payload
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A configured or returned URL could not be parsed
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The view owning the pagination state is gone
    #[error("the view was dismissed")]
    Dismissed,
}

impl Error {
    /// Whether this error means the document is missing rather than unreachable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub(crate) fn from_reqwest(url: &str, after: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                after,
            }
        } else {
            Error::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound {
            doc_type: "post".to_string(),
            uid: "missing".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "post `missing` was not found");
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = Error::Timeout {
            url: "https://cms.test/p2".to_string(),
            after: Duration::from_secs(3),
        };
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("timed out after 3s"));
    }
}
