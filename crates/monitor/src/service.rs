use std::collections::BTreeSet;
use std::sync::Arc;

use rss::FeedEntry;

use crate::definition::{parse_definition, parse_edit};
use crate::error::{SubscriptionError, SubscriptionResult};
use crate::gateway::{persist_all, persist_owner, PersistenceGateway};
use crate::models::{Cursor, OwnerId, Subscription};
use crate::repository::SubscriptionRepository;
use crate::scheduler::MonitorScheduler;
use crate::source::FeedSource;

/// Subscriptions per listing page
pub const PAGE_SIZE: usize = 5;

/// Who issued an operation. Whether the caller is privileged is decided by
/// the front end.
#[derive(Debug, Clone)]
pub struct Caller {
    pub owner: OwnerId,
    /// Mention attached to every message of the caller's new subscriptions
    pub tag: String,
    pub privileged: bool,
}

impl Caller {
    pub fn new(owner: OwnerId, tag: impl Into<String>) -> Self {
        Self {
            owner,
            tag: tag.into(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Pause,
    Resume,
    Unsubscribe,
}

/// Report of a successful subscribe
#[derive(Debug, Clone)]
pub struct Subscribed {
    pub title: String,
    /// Channel title announced by the feed
    pub feed_title: Option<String>,
    /// Entry the cursor was seeded with
    pub latest: FeedEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based
    pub page: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    fn of(items: Vec<T>, page: usize) -> Self {
        let pages = items.len().div_ceil(PAGE_SIZE).max(1);
        let page = page.min(pages - 1);
        let items = items
            .into_iter()
            .skip(page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();
        Self { items, page, pages }
    }
}

/// Subscription management on top of the repository.
///
/// Every structural change is mirrored to the gateway once the repository
/// call has returned, and the scheduler is woken or paused to follow.
pub struct SubscriptionService {
    repository: Arc<SubscriptionRepository>,
    gateway: Arc<dyn PersistenceGateway>,
    source: Arc<dyn FeedSource>,
    scheduler: MonitorScheduler,
}

impl SubscriptionService {
    pub fn new(
        repository: Arc<SubscriptionRepository>,
        gateway: Arc<dyn PersistenceGateway>,
        source: Arc<dyn FeedSource>,
        scheduler: MonitorScheduler,
    ) -> Self {
        Self {
            repository,
            gateway,
            source,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &MonitorScheduler {
        &self.scheduler
    }

    /// Subscribe to every definition in `input`, one per line.
    ///
    /// Each feed is fetched once; its newest entry seeds the cursor so only
    /// later entries are ever dispatched.
    pub async fn subscribe(
        &self,
        caller: &Caller,
        input: &str,
    ) -> Vec<SubscriptionResult<Subscribed>> {
        let mut results = Vec::new();
        for line in input.lines().filter(|l| !l.trim().is_empty()) {
            results.push(self.subscribe_one(caller, line).await);
        }

        if results.iter().any(Result::is_ok) {
            persist_owner(&self.repository, self.gateway.as_ref(), caller.owner).await;
            self.scheduler.wake(caller.privileged);
        }
        results
    }

    async fn subscribe_one(&self, caller: &Caller, line: &str) -> SubscriptionResult<Subscribed> {
        let definition = parse_definition(line)?;
        if self.repository.contains(caller.owner, &definition.title) {
            return Err(SubscriptionError::DuplicateTitle(definition.title));
        }

        let feed = self
            .source
            .fetch(&definition.feed_url)
            .await
            .map_err(|source| SubscriptionError::Feed {
                url: definition.feed_url.clone(),
                source,
            })?;
        let latest = feed
            .head()
            .cloned()
            .ok_or_else(|| SubscriptionError::EmptyFeed(definition.feed_url.clone()))?;

        let subscription = Subscription {
            owner: caller.owner,
            title: definition.title.clone(),
            feed_url: definition.feed_url,
            cursor: Cursor::from_entry(&latest),
            include: definition.include,
            exclude: definition.exclude,
            sensitive: definition.sensitive,
            command: definition.command,
            paused: false,
            tag: caller.tag.clone(),
        };
        self.repository.insert(subscription)?;

        tracing::info!(
            "[{}/{}] Subscribed, latest entry: {}",
            caller.owner,
            definition.title,
            latest.title
        );

        Ok(Subscribed {
            title: definition.title,
            feed_title: feed.title,
            latest,
        })
    }

    /// Apply every edit line in `input` to the caller's subscriptions.
    pub async fn edit(&self, caller: &Caller, input: &str) -> Vec<SubscriptionResult<Subscription>> {
        let results: Vec<_> = input
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                let edit = parse_edit(line)?;
                self.repository.edit(caller.owner, &edit.title, &edit.patch)
            })
            .collect();

        if results.iter().any(Result::is_ok) {
            persist_owner(&self.repository, self.gateway.as_ref(), caller.owner).await;
        }
        results
    }

    /// Pause, resume or unsubscribe the whitespace separated `titles`.
    ///
    /// A privileged caller may name a title held by another owner.
    pub async fn update(
        &self,
        caller: &Caller,
        titles: &str,
        action: BulkAction,
    ) -> Vec<SubscriptionResult<String>> {
        let mut touched = BTreeSet::new();
        let mut results = Vec::new();

        for title in titles.split_whitespace() {
            let result = self.resolve_owner(caller, title).and_then(|owner| {
                self.apply(owner, title, action)?;
                touched.insert(owner);
                Ok(title.to_string())
            });
            results.push(result);
        }

        for owner in &touched {
            persist_owner(&self.repository, self.gateway.as_ref(), *owner).await;
        }
        if action == BulkAction::Resume && !touched.is_empty() {
            self.scheduler.wake(caller.privileged);
        }
        results
    }

    fn apply(&self, owner: OwnerId, title: &str, action: BulkAction) -> SubscriptionResult<()> {
        match action {
            BulkAction::Pause => {
                if self.repository.set_paused(owner, title, true)? {
                    return Err(already(title, "paused"));
                }
            }
            BulkAction::Resume => {
                if !self.repository.set_paused(owner, title, false)? {
                    return Err(already(title, "active"));
                }
            }
            BulkAction::Unsubscribe => {
                self.repository.remove(owner, title)?;
                self.scheduler.cancel_poll(owner, title);
                tracing::info!("[{}/{}] Unsubscribed", owner, title);
            }
        }
        Ok(())
    }

    fn resolve_owner(&self, caller: &Caller, title: &str) -> SubscriptionResult<OwnerId> {
        if self.repository.contains(caller.owner, title) {
            return Ok(caller.owner);
        }
        if caller.privileged {
            if let Some(owner) = self.repository.find_owner(title) {
                return Ok(owner);
            }
        }
        Err(SubscriptionError::NotFound(title.to_string()))
    }

    /// Apply `action` to every subscription of the caller, returning how
    /// many were affected.
    pub async fn update_owner(&self, caller: &Caller, action: BulkAction) -> SubscriptionResult<usize> {
        let owner = caller.owner;
        let count = match action {
            BulkAction::Pause => self.repository.set_owner_paused(owner, true)?,
            BulkAction::Resume => {
                let count = self.repository.set_owner_paused(owner, false)?;
                self.scheduler.wake(caller.privileged);
                count
            }
            BulkAction::Unsubscribe => {
                let removed = self.repository.remove_owner(owner)?;
                for subscription in &removed {
                    self.scheduler.cancel_poll(owner, &subscription.title);
                }
                removed.len()
            }
        };

        persist_owner(&self.repository, self.gateway.as_ref(), owner).await;
        Ok(count)
    }

    /// Apply `action` to every subscription of every owner. Pausing all
    /// also pauses the scheduler; resuming all resumes or starts it.
    pub async fn update_all(&self, action: BulkAction) -> usize {
        let count = match action {
            BulkAction::Pause => {
                let count = self.repository.set_all_paused(true);
                self.scheduler.pause();
                count
            }
            BulkAction::Resume => {
                let count = self.repository.set_all_paused(false);
                self.scheduler.wake(true);
                count
            }
            BulkAction::Unsubscribe => {
                let snapshot = self.repository.snapshot();
                let count = self.repository.clear();
                for subscription in &snapshot {
                    self.scheduler
                        .cancel_poll(subscription.owner, &subscription.title);
                }
                count
            }
        };

        tracing::info!("{:?} applied to {} subscriptions", action, count);
        persist_all(&self.repository, self.gateway.as_ref()).await;
        count
    }

    /// Remove every subscription of the given owners.
    pub async fn delete_owners(&self, owners: &[OwnerId]) -> Vec<SubscriptionResult<OwnerId>> {
        let mut results = Vec::with_capacity(owners.len());

        for &owner in owners {
            let result = self.repository.remove_owner(owner).map(|removed| {
                for subscription in &removed {
                    self.scheduler.cancel_poll(owner, &subscription.title);
                }
                owner
            });
            if result.is_ok() {
                persist_owner(&self.repository, self.gateway.as_ref(), owner).await;
            }
            results.push(result);
        }
        results
    }

    pub fn list(&self, owner: OwnerId, page: usize) -> SubscriptionResult<Page<Subscription>> {
        let subscriptions = self
            .repository
            .get(owner)
            .ok_or(SubscriptionError::OwnerNotFound(owner))?;
        Ok(Page::of(subscriptions, page))
    }

    pub fn list_all(&self, page: usize) -> Page<Subscription> {
        Page::of(self.repository.snapshot(), page)
    }

    /// Fetch the `count` newest entries of one subscription on demand.
    pub async fn latest_entries(
        &self,
        caller: &Caller,
        title: &str,
        count: usize,
    ) -> SubscriptionResult<Vec<FeedEntry>> {
        let owner = self.resolve_owner(caller, title)?;
        let subscription = self
            .repository
            .get_subscription(owner, title)
            .ok_or_else(|| SubscriptionError::NotFound(title.to_string()))?;

        let feed = self
            .source
            .fetch(&subscription.feed_url)
            .await
            .map_err(|source| SubscriptionError::Feed {
                url: subscription.feed_url.clone(),
                source,
            })?;

        if count > feed.entries.len() {
            return Err(SubscriptionError::LookbackExceeded {
                requested: count,
                available: feed.entries.len(),
            });
        }

        Ok(feed.entries.into_iter().take(count).collect())
    }
}

fn already(title: &str, state: &'static str) -> SubscriptionError {
    SubscriptionError::AlreadyInState {
        title: title.to_string(),
        state,
    }
}
