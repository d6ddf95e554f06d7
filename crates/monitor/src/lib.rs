//! Feed subscription monitor.
//!
//! Owners subscribe to feeds; a recurring job polls every active
//! subscription, filters new entries by keyword groups and dispatches a
//! notification or command for each entry that passes.

pub mod config;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod poll;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod template;
pub mod tick;

#[cfg(test)]
pub(crate) mod testing;

pub use config::MonitorConfig;
pub use dispatch::Dispatcher;
pub use error::{
    DispatchError, GatewayError, PollError, PollResult, SubscriptionError, SubscriptionResult,
};
pub use gateway::{NoopGateway, PersistenceGateway};
pub use models::{Cursor, KeywordGroups, OwnerId, Subscription, SubscriptionPatch};
pub use poll::{PollCycle, PollOutcome, PollSettings};
pub use repository::SubscriptionRepository;
pub use scheduler::{MonitorScheduler, SchedulerState};
pub use service::{BulkAction, Caller, Page, Subscribed, SubscriptionService, PAGE_SIZE};
pub use source::FeedSource;
pub use template::{CommandRouting, CommandTemplate};
pub use tick::{FeedMonitor, TickReport};
