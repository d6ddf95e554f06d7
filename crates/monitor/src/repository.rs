use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::models::{Cursor, OwnerId, Subscription, SubscriptionPatch};

type OwnerFeeds = BTreeMap<String, Subscription>;

/// In-memory store of every owner's subscriptions.
///
/// All access goes through short critical sections; nothing here awaits or
/// performs I/O. Callers receive clones and mirror structural changes to the
/// persistence gateway themselves once the call returns.
#[derive(Default)]
pub struct SubscriptionRepository {
    owners: Mutex<BTreeMap<OwnerId, OwnerFeeds>>,
    persisting: tokio::sync::Mutex<()>,
}

impl SubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held from taking a snapshot until the gateway has stored it, so
    /// snapshots are stored in the order they were taken.
    pub(crate) fn persist_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.persisting
    }

    /// Build a repository from persisted records. Later duplicates win.
    pub fn from_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let repository = Self::new();
        for subscription in subscriptions {
            repository.put(subscription);
        }
        repository
    }

    /// All subscriptions of `owner`, ordered by title
    pub fn get(&self, owner: OwnerId) -> Option<Vec<Subscription>> {
        self.owners
            .lock()
            .get(&owner)
            .map(|feeds| feeds.values().cloned().collect())
    }

    pub fn get_subscription(&self, owner: OwnerId, title: &str) -> Option<Subscription> {
        self.owners
            .lock()
            .get(&owner)
            .and_then(|feeds| feeds.get(title))
            .cloned()
    }

    pub fn contains(&self, owner: OwnerId, title: &str) -> bool {
        self.owners
            .lock()
            .get(&owner)
            .is_some_and(|feeds| feeds.contains_key(title))
    }

    /// Add a new subscription, rejecting a title the owner already uses.
    pub fn insert(&self, subscription: Subscription) -> SubscriptionResult<()> {
        let mut owners = self.owners.lock();
        let feeds = owners.entry(subscription.owner).or_default();

        if feeds.contains_key(&subscription.title) {
            return Err(SubscriptionError::DuplicateTitle(subscription.title));
        }

        feeds.insert(subscription.title.clone(), subscription);
        Ok(())
    }

    /// Insert or replace, returning the previous record.
    pub fn put(&self, subscription: Subscription) -> Option<Subscription> {
        self.owners
            .lock()
            .entry(subscription.owner)
            .or_default()
            .insert(subscription.title.clone(), subscription)
    }

    /// Remove one subscription. The owner is pruned once empty.
    pub fn remove(&self, owner: OwnerId, title: &str) -> SubscriptionResult<Subscription> {
        let mut owners = self.owners.lock();
        let feeds = owners
            .get_mut(&owner)
            .ok_or(SubscriptionError::OwnerNotFound(owner))?;

        let removed = feeds
            .remove(title)
            .ok_or_else(|| SubscriptionError::NotFound(title.to_string()))?;

        if feeds.is_empty() {
            owners.remove(&owner);
        }

        Ok(removed)
    }

    pub fn remove_owner(&self, owner: OwnerId) -> SubscriptionResult<Vec<Subscription>> {
        self.owners
            .lock()
            .remove(&owner)
            .map(|feeds| feeds.into_values().collect())
            .ok_or(SubscriptionError::OwnerNotFound(owner))
    }

    /// Drop everything, returning how many subscriptions were removed.
    pub fn clear(&self) -> usize {
        let mut owners = self.owners.lock();
        let count = owners.values().map(BTreeMap::len).sum();
        owners.clear();
        count
    }

    /// Set the pause flag, returning the previous value.
    pub fn set_paused(&self, owner: OwnerId, title: &str, paused: bool) -> SubscriptionResult<bool> {
        let mut owners = self.owners.lock();
        let subscription = owners
            .get_mut(&owner)
            .and_then(|feeds| feeds.get_mut(title))
            .ok_or_else(|| SubscriptionError::NotFound(title.to_string()))?;

        Ok(std::mem::replace(&mut subscription.paused, paused))
    }

    /// Set the pause flag on all of `owner`'s subscriptions, returning how
    /// many changed.
    pub fn set_owner_paused(&self, owner: OwnerId, paused: bool) -> SubscriptionResult<usize> {
        let mut owners = self.owners.lock();
        let feeds = owners
            .get_mut(&owner)
            .ok_or(SubscriptionError::OwnerNotFound(owner))?;

        Ok(set_feeds_paused(feeds, paused))
    }

    pub fn set_all_paused(&self, paused: bool) -> usize {
        self.owners
            .lock()
            .values_mut()
            .map(|feeds| set_feeds_paused(feeds, paused))
            .sum()
    }

    /// Apply an edit, returning the updated record.
    pub fn edit(
        &self,
        owner: OwnerId,
        title: &str,
        patch: &SubscriptionPatch,
    ) -> SubscriptionResult<Subscription> {
        let mut owners = self.owners.lock();
        let subscription = owners
            .get_mut(&owner)
            .and_then(|feeds| feeds.get_mut(title))
            .ok_or_else(|| SubscriptionError::NotFound(title.to_string()))?;

        patch.apply(subscription);
        Ok(subscription.clone())
    }

    /// Move the cursor of a subscription that still exists.
    ///
    /// Returns `false` when the subscription was removed in the meantime.
    pub fn advance_cursor(&self, owner: OwnerId, title: &str, cursor: Cursor) -> bool {
        match self
            .owners
            .lock()
            .get_mut(&owner)
            .and_then(|feeds| feeds.get_mut(title))
        {
            Some(subscription) => {
                subscription.cursor = cursor;
                true
            }
            None => false,
        }
    }

    /// Copy of every subscription, grouped by owner then title.
    pub fn snapshot(&self) -> Vec<Subscription> {
        self.owners
            .lock()
            .values()
            .flat_map(|feeds| feeds.values().cloned())
            .collect()
    }

    /// First owner (lowest id) holding a subscription called `title`.
    pub fn find_owner(&self, title: &str) -> Option<OwnerId> {
        self.owners
            .lock()
            .iter()
            .find(|(_, feeds)| feeds.contains_key(title))
            .map(|(owner, _)| *owner)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.lock().len()
    }

    pub fn len(&self) -> usize {
        self.owners.lock().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.lock().is_empty()
    }

    /// Whether at least one subscription is unpaused
    pub fn has_active(&self) -> bool {
        self.owners
            .lock()
            .values()
            .any(|feeds| feeds.values().any(|s| !s.paused))
    }
}

fn set_feeds_paused(feeds: &mut OwnerFeeds, paused: bool) -> usize {
    let mut changed = 0;
    for subscription in feeds.values_mut() {
        if subscription.paused != paused {
            subscription.paused = paused;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::subscription;

    #[test]
    fn test_duplicate_title_rejected() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "shows", "https://a.example/rss"))
            .unwrap();

        let err = repo
            .insert(subscription(1, "shows", "https://b.example/rss"))
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::DuplicateTitle(t) if t == "shows"));

        let original = repo.get_subscription(1, "shows").unwrap();
        assert_eq!(original.feed_url, "https://a.example/rss");
    }

    #[test]
    fn test_same_title_for_different_owners() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "shows", "https://a.example/rss"))
            .unwrap();
        repo.insert(subscription(2, "shows", "https://a.example/rss"))
            .unwrap();
        assert_eq!(repo.owner_count(), 2);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_titles_are_case_sensitive() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "shows", "https://a.example/rss"))
            .unwrap();
        repo.insert(subscription(1, "Shows", "https://a.example/rss"))
            .unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_last_removal_prunes_owner() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "a", "https://a.example/rss"))
            .unwrap();
        repo.insert(subscription(1, "b", "https://b.example/rss"))
            .unwrap();

        repo.remove(1, "a").unwrap();
        assert!(repo.get(1).is_some());

        repo.remove(1, "b").unwrap();
        assert!(repo.get(1).is_none());
        assert_eq!(repo.owner_count(), 0);
    }

    #[test]
    fn test_remove_unknown() {
        let repo = SubscriptionRepository::new();
        assert!(matches!(
            repo.remove(7, "x"),
            Err(SubscriptionError::OwnerNotFound(7))
        ));

        repo.insert(subscription(7, "a", "https://a.example/rss"))
            .unwrap();
        assert!(matches!(
            repo.remove(7, "x"),
            Err(SubscriptionError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_paused_returns_prior_state() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "a", "https://a.example/rss"))
            .unwrap();

        assert!(!repo.set_paused(1, "a", true).unwrap());
        assert!(repo.set_paused(1, "a", true).unwrap());
        assert!(!repo.has_active());
    }

    #[test]
    fn test_bulk_pause_counts_changes() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "a", "https://a.example/rss"))
            .unwrap();
        repo.insert(subscription(1, "b", "https://b.example/rss"))
            .unwrap();
        repo.insert(subscription(2, "c", "https://c.example/rss"))
            .unwrap();
        repo.set_paused(1, "a", true).unwrap();

        assert_eq!(repo.set_owner_paused(1, true).unwrap(), 1);
        assert!(repo.has_active());
        assert_eq!(repo.set_all_paused(true), 1);
        assert!(!repo.has_active());
        assert_eq!(repo.set_all_paused(false), 3);
    }

    #[test]
    fn test_advance_cursor_skips_removed() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(1, "a", "https://a.example/rss"))
            .unwrap();

        assert!(repo.advance_cursor(1, "a", Cursor::new("l2", "t2")));
        assert_eq!(
            repo.get_subscription(1, "a").unwrap().cursor,
            Cursor::new("l2", "t2")
        );

        repo.remove(1, "a").unwrap();
        assert!(!repo.advance_cursor(1, "a", Cursor::new("l3", "t3")));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_find_owner_and_clear() {
        let repo = SubscriptionRepository::new();
        repo.insert(subscription(5, "a", "https://a.example/rss"))
            .unwrap();
        repo.insert(subscription(3, "b", "https://b.example/rss"))
            .unwrap();

        assert_eq!(repo.find_owner("a"), Some(5));
        assert_eq!(repo.find_owner("zzz"), None);
        assert_eq!(repo.clear(), 2);
        assert!(repo.snapshot().is_empty());
    }
}
