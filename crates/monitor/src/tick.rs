use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::dispatch::Dispatcher;
use crate::error::PollError;
use crate::gateway::PersistenceGateway;
use crate::models::{OwnerId, Subscription};
use crate::poll::{PollCycle, PollOutcome, PollSettings};
use crate::repository::SubscriptionRepository;
use crate::source::FeedSource;

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Feeds that were fetch-attempted
    pub polled: usize,
    pub advanced: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// No feed was fetch-attempted
    pub idle: bool,
    /// The tick was stopped by the scheduler-wide abort
    pub aborted: bool,
}

enum FeedResult {
    Skipped,
    Polled(Result<PollOutcome, PollError>),
}

/// Runs one tick over every unpaused subscription, a bounded number of
/// feeds at a time.
pub struct FeedMonitor {
    poll: PollCycle,
    concurrency: usize,
    in_flight: Mutex<HashMap<(OwnerId, String), CancellationToken>>,
}

impl FeedMonitor {
    pub fn new(poll: PollCycle, concurrency: usize) -> Self {
        Self {
            poll,
            concurrency: concurrency.max(1),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(
        config: &MonitorConfig,
        source: Arc<dyn FeedSource>,
        dispatcher: Arc<dyn Dispatcher>,
        repository: Arc<SubscriptionRepository>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        let poll = PollCycle::new(
            source,
            dispatcher,
            repository,
            gateway,
            PollSettings::from(config),
        );
        Self::new(poll, config.concurrency())
    }

    pub fn repository(&self) -> &Arc<SubscriptionRepository> {
        self.poll.repository()
    }

    /// Abort the in-flight poll of one feed. Returns `false` when that feed
    /// is not being polled right now.
    pub fn cancel_poll(&self, owner: OwnerId, title: &str) -> bool {
        match self.in_flight.lock().get(&(owner, title.to_string())) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn tick(&self, abort: &CancellationToken) -> TickReport {
        let candidates: Vec<Subscription> = self
            .repository()
            .snapshot()
            .into_iter()
            .filter(|s| !s.paused)
            .collect();

        tracing::debug!("Tick over {} active subscriptions", candidates.len());

        let results: Vec<FeedResult> = stream::iter(candidates)
            .map(|subscription| self.poll_one(subscription, abort))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = TickReport {
            aborted: abort.is_cancelled(),
            ..Default::default()
        };

        for result in results {
            match result {
                FeedResult::Skipped => {}
                FeedResult::Polled(result) => {
                    report.polled += 1;
                    match result {
                        Ok(PollOutcome::Unchanged) => report.unchanged += 1,
                        Ok(PollOutcome::Advanced { .. }) => report.advanced += 1,
                        Err(PollError::Cancelled) => report.cancelled += 1,
                        Err(_) => report.failed += 1,
                    }
                }
            }
        }
        report.idle = report.polled == 0;

        tracing::info!(
            "Tick finished: {} polled, {} advanced, {} failed, {} cancelled",
            report.polled,
            report.advanced,
            report.failed,
            report.cancelled
        );
        report
    }

    async fn poll_one(&self, snapshot: Subscription, abort: &CancellationToken) -> FeedResult {
        if abort.is_cancelled() {
            return FeedResult::Skipped;
        }

        // Re-read so a pause or removal since the snapshot is honoured
        let subscription = match self
            .repository()
            .get_subscription(snapshot.owner, &snapshot.title)
        {
            Some(subscription) if !subscription.paused => subscription,
            _ => return FeedResult::Skipped,
        };

        let key = (subscription.owner, subscription.title.clone());
        let token = abort.child_token();
        self.in_flight.lock().insert(key.clone(), token.clone());

        let result = self.poll.run(&subscription, &token).await;

        self.in_flight.lock().remove(&key);

        match &result {
            Err(PollError::Cancelled) => {
                tracing::info!(
                    "[{}/{}] Poll cancelled",
                    subscription.owner,
                    subscription.title
                );
            }
            Err(e) => {
                tracing::error!(
                    "[{}/{}] Poll failed for {}: {}",
                    subscription.owner,
                    subscription.title,
                    subscription.feed_url,
                    e
                );
            }
            Ok(_) => {}
        }

        FeedResult::Polled(result)
    }
}
