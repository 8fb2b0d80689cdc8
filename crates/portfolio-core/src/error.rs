use thiserror::Error;

/// Why a single upstream call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamCause {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("unknown symbol")]
    UnknownSymbol,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("batch deadline exceeded")]
    DeadlineExceeded,
}

/// A symbol-scoped upstream failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{symbol}: {cause}")]
pub struct UpstreamError {
    pub symbol: String,
    pub cause: UpstreamCause,
}

impl UpstreamError {
    pub fn new(symbol: impl Into<String>, cause: UpstreamCause) -> Self {
        Self {
            symbol: symbol.into(),
            cause,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.cause, UpstreamCause::RateLimited)
    }
}

/// Failure of a whole snapshot refresh. Per-symbol failures never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("Batch fetch failed: {0}")]
    BatchFetchFailed(String),
}
