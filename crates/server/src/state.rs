use std::sync::Arc;

use monitor::{
    FeedMonitor, MonitorScheduler, PersistenceGateway, SubscriptionRepository,
    SubscriptionService,
};
use notify::NotificationHandle;
use rss::RssClient;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::AppResult;
use crate::repositories::SubscriptionStore;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub settings: Arc<Settings>,
    pub repository: Arc<SubscriptionRepository>,
    pub notification: NotificationHandle,
    pub scheduler: MonitorScheduler,
    pub subscriptions: Arc<SubscriptionService>,
}

impl AppState {
    /// Load stored subscriptions and wire the monitor. Nothing is started.
    pub async fn new(db: SqlitePool, config: Config, settings: Settings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.monitor.request_timeout())
            .build()?;

        let store = Arc::new(SubscriptionStore::new(db.clone()));
        let stored = store.load_all().await?;
        tracing::info!("Loaded {} stored subscriptions", stored.len());
        let repository = Arc::new(SubscriptionRepository::from_subscriptions(stored));

        let notification =
            notify::create_notification_service(settings.notification.clone(), client.clone());
        let source = Arc::new(RssClient::with_client(client));

        let monitor = Arc::new(FeedMonitor::from_config(
            &settings.monitor,
            source.clone(),
            Arc::new(notification.clone()),
            Arc::clone(&repository),
            store.clone(),
        ));
        let scheduler = MonitorScheduler::new(monitor, &settings.monitor);

        let subscriptions = Arc::new(SubscriptionService::new(
            Arc::clone(&repository),
            store,
            source,
            scheduler.clone(),
        ));

        Ok(Self {
            db,
            config: Arc::new(config),
            settings: Arc::new(settings),
            repository,
            notification,
            scheduler,
            subscriptions,
        })
    }

    /// Start the monitor when there is something to poll and somewhere to
    /// send the results.
    pub fn start_monitor(&self) -> bool {
        if self.repository.is_empty() {
            tracing::info!("No subscriptions yet, monitor not started");
            return false;
        }
        if !self.notification.is_ready() {
            tracing::warn!("No usable notification target configured, monitor not started");
            return false;
        }
        self.scheduler.start()
    }
}
