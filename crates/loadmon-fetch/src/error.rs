/// Errors that can occur when resolving a remote resource.
///
/// `RateLimited` is the one classification consumers must be able to tell
/// apart (it gets its own message upstream); every other variant is a
/// generic fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Upstream signalled rate limiting (HTTP 403). Callers may retry
    /// after backoff.
    #[error("upstream rate limited, retry after backoff")]
    RateLimited,

    /// Non-2xx status other than the rate-limit signal.
    #[error("upstream HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Resolution exceeded the configured timeout.
    #[error("fetch timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The payload was fetched but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The resource exists but holds no data yet. Surfaced separately so
    /// consumers can render "not yet available" instead of an error.
    #[error("no data available at '{path}'")]
    NoData { path: String },
}

impl FetchError {
    /// True for every classification except the dedicated rate-limit one.
    pub fn is_generic_failure(&self) -> bool {
        !matches!(self, FetchError::RateLimited)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

impl From<loadmon_common::records::RecordError> for FetchError {
    fn from(e: loadmon_common::records::RecordError) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Convenience `Result` alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
