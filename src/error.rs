//! Fetch failure taxonomy
//!
//! Every call against the right.codes API either yields a JSON object or one
//! of the three failure kinds below. The refresh scheduler reacts to the kind,
//! never to the message text.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Classified failure of a single fetch operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Credentials are missing, invalid or expired (HTTP 401/403)
    #[error("authentication failed (token may have expired)")]
    Unauthenticated,

    /// The server asked us to slow down (HTTP 429)
    #[error("rate limited by server")]
    RateLimited {
        /// Server-suggested retry time parsed from `Retry-After`, local time
        retry_at: Option<NaiveDateTime>,
    },

    /// Anything else: transport errors and non-2xx responses
    #[error("request failed: {0}")]
    RequestFailed(String),
}

impl FetchError {
    /// Short machine-friendly label, used by `doctor` output and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unauthenticated => "auth",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::RequestFailed(_) => "request_failed",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Result alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;
