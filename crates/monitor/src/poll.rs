use std::sync::Arc;
use std::time::Duration;

use rss::Feed;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::dispatch::{format_message, Dispatcher};
use crate::error::{PollError, PollResult};
use crate::filter;
use crate::gateway::{persist_owner, PersistenceGateway};
use crate::models::{Cursor, Subscription};
use crate::repository::SubscriptionRepository;
use crate::source::FeedSource;
use crate::template::CommandRouting;

/// Result of a poll that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Head entry equals the cursor
    Unchanged,
    Advanced {
        dispatched: usize,
        filtered: usize,
        /// The cursor was not found among the fetched entries
        lookback_exhausted: bool,
    },
}

/// Tunables of a poll, taken from [`MonitorConfig`]
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub entry_delay: Duration,
    pub fetch_retries: u32,
    pub retry_delay: Duration,
    pub routing: CommandRouting,
}

impl From<&MonitorConfig> for PollSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            entry_delay: config.entry_delay(),
            fetch_retries: config.fetch_retries,
            retry_delay: config.retry_delay(),
            routing: config.routing(),
        }
    }
}

/// Polls a single subscription: fetch, find the new entries, filter,
/// dispatch, advance the cursor.
pub struct PollCycle {
    source: Arc<dyn FeedSource>,
    dispatcher: Arc<dyn Dispatcher>,
    repository: Arc<SubscriptionRepository>,
    gateway: Arc<dyn PersistenceGateway>,
    settings: PollSettings,
}

impl PollCycle {
    pub fn new(
        source: Arc<dyn FeedSource>,
        dispatcher: Arc<dyn Dispatcher>,
        repository: Arc<SubscriptionRepository>,
        gateway: Arc<dyn PersistenceGateway>,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            dispatcher,
            repository,
            gateway,
            settings,
        }
    }

    pub fn repository(&self) -> &Arc<SubscriptionRepository> {
        &self.repository
    }

    /// Poll `subscription`, a snapshot taken from the repository.
    ///
    /// Entries newer than the cursor are visited newest first, with the
    /// entry delay before each one. Cancelling `cancel` during that delay
    /// stops the poll with [`PollError::Cancelled`]; messages already sent
    /// stay sent and the cursor is left alone.
    pub async fn run(
        &self,
        subscription: &Subscription,
        cancel: &CancellationToken,
    ) -> PollResult<PollOutcome> {
        let feed = self.fetch_with_retry(&subscription.feed_url, cancel).await?;
        let head = feed.head().ok_or(PollError::EmptyFeed)?;

        if subscription.cursor.matches(head) {
            tracing::debug!(
                "[{}/{}] No new entries",
                subscription.owner,
                subscription.title
            );
            return Ok(PollOutcome::Unchanged);
        }

        let mut dispatched = 0;
        let mut filtered = 0;
        let mut lookback_exhausted = true;

        for entry in &feed.entries {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.settings.entry_delay) => {}
            }

            if subscription.cursor.matches(entry) {
                lookback_exhausted = false;
                break;
            }

            if !filter::matches(
                &entry.title,
                &subscription.include,
                &subscription.exclude,
                subscription.sensitive,
            ) {
                tracing::debug!(
                    "[{}/{}] Filtered out: {}",
                    subscription.owner,
                    subscription.title,
                    entry.title
                );
                filtered += 1;
                continue;
            }

            let message = format_message(subscription, entry, &self.settings.routing);
            self.dispatcher.dispatch(message).await?;
            dispatched += 1;
        }

        if lookback_exhausted {
            tracing::warn!(
                "[{}/{}] Reached max index {} for this feed without finding the last entry. \
                 Maybe use a shorter interval to not miss entries",
                subscription.owner,
                subscription.title,
                feed.entries.len()
            );
        }

        let cursor = Cursor::from_entry(head);
        if self
            .repository
            .advance_cursor(subscription.owner, &subscription.title, cursor)
        {
            persist_owner(&self.repository, self.gateway.as_ref(), subscription.owner).await;
            tracing::info!(
                "[{}/{}] Last item: {}",
                subscription.owner,
                subscription.title,
                head.effective_link()
            );
        } else {
            tracing::debug!(
                "[{}/{}] Subscription removed during poll, cursor not saved",
                subscription.owner,
                subscription.title
            );
        }

        Ok(PollOutcome::Advanced {
            dispatched,
            filtered,
            lookback_exhausted,
        })
    }

    /// Fetch with up to `fetch_retries` extra attempts. Errors that would
    /// repeat on retry fail at once.
    async fn fetch_with_retry(&self, url: &str, cancel: &CancellationToken) -> PollResult<Feed> {
        let attempts = self.settings.fetch_retries + 1;
        let mut attempt = 1;

        loop {
            match self.source.fetch(url).await {
                Ok(feed) => return Ok(feed),
                Err(source) if attempt >= attempts || !source.is_transient() => {
                    return Err(PollError::Fetch {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        e
                    );
                }
            }

            let backoff = self.settings.retry_delay * attempt;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;
        }
    }
}
