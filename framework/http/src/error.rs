use std::time::Duration;

use reqwest::StatusCode;

/// Failures surfaced by [crate::session::Session].
///
/// [SessionError::Timeout] and [SessionError::SlowPost] are scored differently from the other
/// variants, so callers should keep them in the error chain rather than flattening to a string.
///
/// Messages name the failure category only. They end up in the feedback shown to a team, where
/// repeated failures must collapse into one line, so per-request detail (URLs, timings) is left
/// to the `Debug` output.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid URL")]
    InvalidUrl(String),

    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("request failed")]
    Request(#[source] reqwest::Error),

    #[error("request failed.\n{0}")]
    Status(StatusCode),

    #[error("post request timeout")]
    SlowPost { elapsed: Duration, limit: Duration },

    #[error("failed to decode response body")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SessionError::Timeout(e)
        } else {
            SessionError::Request(e)
        }
    }
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }

    pub fn is_slow_post(&self) -> bool {
        matches!(self, SessionError::SlowPost { .. })
    }
}


/// Reasons a response is not cacheable. None of these abort the request that produced the
/// response; they only mean the response is not stored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache-Control header not found")]
    MissingCacheControl,

    #[error("no-store detected")]
    NoStore,

    #[error("cache age not found")]
    MissingMaxAge,

    #[error("invalid max-age: {0}")]
    InvalidMaxAge(String),
}
