use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RssError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} when fetching {url}")]
    Status { status: StatusCode, url: String },

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

impl RssError {
    /// Whether fetching again later may succeed. A body that is not a feed
    /// or a client error status will not change on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder(),
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            Self::Parse(_) => false,
        }
    }
}
