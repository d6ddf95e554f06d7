use rss::RssError;
use thiserror::Error;

use crate::models::OwnerId;

/// Failure of one feed's poll. Never aborts the rest of a tick.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetch failed after {attempts} attempts: {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: RssError,
    },

    #[error("feed returned no entries")]
    EmptyFeed,

    #[error("poll cancelled")]
    Cancelled,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch sink unavailable: {0}")]
    Notify(#[from] notify::NotifyError),
}

/// Validation failures reported back to whoever issued the operation.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Wrong input format: {0}")]
    InvalidDefinition(String),

    #[error("Title {0} already subscribed")]
    DuplicateTitle(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("User {0} has no subscriptions")]
    OwnerNotFound(OwnerId),

    #[error("{title} already {state}")]
    AlreadyInState { title: String, state: &'static str },

    #[error("The link {url} doesn't seem to be a feed or it's region-blocked: {source}")]
    Feed {
        url: String,
        #[source]
        source: RssError,
    },

    #[error("The link {0} returned no entries")]
    EmptyFeed(String),

    #[error("Parse depth exceeded: requested {requested} items, feed has {available}")]
    LookbackExceeded { requested: usize, available: usize },
}

/// Failure reported by a persistence backend
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("storage error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type PollResult<T> = std::result::Result<T, PollError>;
pub type SubscriptionResult<T> = std::result::Result<T, SubscriptionError>;
