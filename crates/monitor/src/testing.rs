//! In-memory fakes shared by the unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rss::{Feed, FeedEntry, RssError};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, GatewayError};
use crate::gateway::PersistenceGateway;
use crate::models::{Cursor, KeywordGroups, OwnerId, Subscription};
use crate::source::FeedSource;

pub fn subscription(owner: OwnerId, title: &str, url: &str) -> Subscription {
    Subscription {
        owner,
        title: title.to_string(),
        feed_url: url.to_string(),
        cursor: Cursor::default(),
        include: KeywordGroups::default(),
        exclude: KeywordGroups::default(),
        sensitive: false,
        command: None,
        paused: false,
        tag: "@tester".to_string(),
    }
}

/// Feed built from `(title, link)` pairs, newest first
pub fn feed(entries: &[(&str, &str)]) -> Feed {
    Feed {
        title: Some("Test feed".to_string()),
        entries: entries
            .iter()
            .map(|(title, link)| FeedEntry::new(*title, *link))
            .collect(),
    }
}

#[derive(Clone)]
pub enum Step {
    Serve(Feed),
    /// Transient failure, worth retrying
    Fail,
    /// Body that is not a feed
    Garbage,
}

/// Serves scripted responses per URL; the last step repeats.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, url: &str, steps: Vec<Step>) {
        self.scripts.lock().insert(url.to_string(), steps.into());
    }

    pub fn serve(&self, url: &str, feed: Feed) {
        self.script(url, vec![Step::Serve(feed)]);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> rss::Result<Feed> {
        *self.calls.lock().entry(url.to_string()).or_default() += 1;

        let step = {
            let mut scripts = self.scripts.lock();
            match scripts.get_mut(url) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };

        match step {
            Some(Step::Serve(feed)) => Ok(feed),
            Some(Step::Fail) => Err(RssError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: url.to_string(),
            }),
            Some(Step::Garbage) => Err(RssError::Parse("not a feed".to_string())),
            None => Err(RssError::Parse(format!("no script for {}", url))),
        }
    }
}

/// Records dispatched messages; optionally cancels a token after a number
/// of dispatches.
#[derive(Default)]
pub struct RecordingDispatcher {
    messages: Mutex<Vec<String>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_after(&self, count: usize, token: CancellationToken) {
        *self.cancel_after.lock() = Some((count, token));
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Messages containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, message: String) -> Result<(), DispatchError> {
        let sent = {
            let mut messages = self.messages.lock();
            messages.push(message);
            messages.len()
        };

        if let Some((count, token)) = &*self.cancel_after.lock() {
            if sent >= *count {
                token.cancel();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Upsert(OwnerId, usize),
    Delete(OwnerId),
    DeleteAll,
    UpsertAll(usize),
}

/// Records every call and keeps the last snapshot stored per owner.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    stored: Mutex<BTreeMap<OwnerId, Vec<Subscription>>>,
    slow_first: Mutex<Option<Duration>>,
    failing: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write is recorded but reports a backend failure
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// The first upsert takes `delay` before it is stored
    pub fn slow_first(delay: Duration) -> Self {
        Self {
            slow_first: Mutex::new(Some(delay)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn stored(&self, owner: OwnerId) -> Option<Vec<Subscription>> {
        self.stored.lock().get(&owner).cloned()
    }

    fn write(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.lock().push(call);
        if self.failing {
            return Err(GatewayError::Backend("database is locked".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for RecordingGateway {
    async fn upsert(
        &self,
        owner: OwnerId,
        subscriptions: &[Subscription],
    ) -> Result<(), GatewayError> {
        let delay = self.slow_first.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.write(GatewayCall::Upsert(owner, subscriptions.len()))?;
        self.stored.lock().insert(owner, subscriptions.to_vec());
        Ok(())
    }

    async fn delete(&self, owner: OwnerId) -> Result<(), GatewayError> {
        self.write(GatewayCall::Delete(owner))?;
        self.stored.lock().remove(&owner);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), GatewayError> {
        self.write(GatewayCall::DeleteAll)?;
        self.stored.lock().clear();
        Ok(())
    }

    async fn upsert_all(&self, subscriptions: &[Subscription]) -> Result<(), GatewayError> {
        self.write(GatewayCall::UpsertAll(subscriptions.len()))?;
        let mut grouped: BTreeMap<OwnerId, Vec<Subscription>> = BTreeMap::new();
        for subscription in subscriptions {
            grouped
                .entry(subscription.owner)
                .or_default()
                .push(subscription.clone());
        }
        self.stored.lock().extend(grouped);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Subscription>, GatewayError> {
        Ok(self.stored.lock().values().flatten().cloned().collect())
    }
}
