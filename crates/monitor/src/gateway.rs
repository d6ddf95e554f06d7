use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{OwnerId, Subscription};
use crate::repository::SubscriptionRepository;

/// Durable storage for subscription records.
///
/// The in-memory repository is authoritative at runtime; the gateway is
/// best-effort durability. Failures are logged by the callers below and
/// never roll back in-memory state.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Replace the stored subscriptions of one owner
    async fn upsert(&self, owner: OwnerId, subscriptions: &[Subscription])
        -> Result<(), GatewayError>;

    async fn delete(&self, owner: OwnerId) -> Result<(), GatewayError>;

    async fn delete_all(&self) -> Result<(), GatewayError>;

    /// Replace the stored subscriptions of every owner present in `subscriptions`
    async fn upsert_all(&self, subscriptions: &[Subscription]) -> Result<(), GatewayError>;

    async fn load_all(&self) -> Result<Vec<Subscription>, GatewayError>;
}

/// Gateway that stores nothing
pub struct NoopGateway;

#[async_trait]
impl PersistenceGateway for NoopGateway {
    async fn upsert(&self, _: OwnerId, _: &[Subscription]) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn delete(&self, _: OwnerId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn upsert_all(&self, _: &[Subscription]) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Subscription>, GatewayError> {
        Ok(Vec::new())
    }
}

/// Mirror the current in-memory state of `owner`: upsert while it still has
/// subscriptions, delete once it has been pruned.
pub async fn persist_owner(
    repository: &SubscriptionRepository,
    gateway: &dyn PersistenceGateway,
    owner: OwnerId,
) {
    let _writer = repository.persist_lock().lock().await;
    let result = match repository.get(owner) {
        Some(subscriptions) => gateway.upsert(owner, &subscriptions).await,
        None => gateway.delete(owner).await,
    };

    if let Err(e) = result {
        tracing::error!("[owner={}] Failed to persist subscriptions: {}", owner, e);
    }
}

/// Mirror the whole repository
pub async fn persist_all(repository: &SubscriptionRepository, gateway: &dyn PersistenceGateway) {
    let _writer = repository.persist_lock().lock().await;
    let result = if repository.is_empty() {
        gateway.delete_all().await
    } else {
        gateway.upsert_all(&repository.snapshot()).await
    };

    if let Err(e) = result {
        tracing::error!("Failed to persist all subscriptions: {}", e);
    }
}
