use thiserror::Error;

/// Rejected deadline bound.
///
/// Raised synchronously by the deadline timer, before anything is scheduled.
/// Bounds are never clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("argument {value} to the deadline timer must be a positive, finite number of milliseconds")]
pub struct InvalidArgument {
    pub value: f64,
}

impl InvalidArgument {
    /// Validate a millisecond delay, returning it unchanged when usable.
    pub fn check_delay_ms(value: f64) -> Result<f64, Self> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self { value })
        }
    }
}

/// Failure talking to the item source.
///
/// A deadline miss is never a `FetchError`; it resolves to the caller's
/// fallback instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed body from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::Cancelled { url } => url,
        }
    }

    /// Whether a later attempt may succeed.
    ///
    /// Note: 408 and 429 are retryable even though they are client errors.
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            FetchError::InvalidUrl { .. } | FetchError::Decode { .. } | FetchError::Cancelled { .. } => {
                false
            }
        }
    }
}
