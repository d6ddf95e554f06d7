use std::collections::BTreeMap;

use async_trait::async_trait;
use monitor::{GatewayError, OwnerId, PersistenceGateway, Subscription};
use sqlx::SqlitePool;

/// SQLite storage for subscriptions: one row per owner, the owner's
/// subscriptions serialized as a JSON array.
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert_row(
        executor: impl sqlx::SqliteExecutor<'_>,
        owner: OwnerId,
        subscriptions: &[Subscription],
    ) -> Result<(), GatewayError> {
        let data = serde_json::to_string(subscriptions)
            .map_err(|e| GatewayError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (owner_id, data)
            VALUES ($1, $2)
            ON CONFLICT(owner_id) DO UPDATE SET
                data = excluded.data,
                updated_at = datetime('now')
            "#,
        )
        .bind(owner)
        .bind(&data)
        .execute(executor)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    owner_id: i64,
    data: String,
}

fn backend(e: sqlx::Error) -> GatewayError {
    GatewayError::Backend(e.to_string())
}

#[async_trait]
impl PersistenceGateway for SubscriptionStore {
    async fn upsert(&self, owner: OwnerId, subscriptions: &[Subscription]) -> Result<(), GatewayError> {
        Self::upsert_row(&self.pool, owner, subscriptions).await
    }

    async fn delete(&self, owner: OwnerId) -> Result<(), GatewayError> {
        sqlx::query("DELETE FROM subscriptions WHERE owner_id = $1")
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), GatewayError> {
        sqlx::query("DELETE FROM subscriptions")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn upsert_all(&self, subscriptions: &[Subscription]) -> Result<(), GatewayError> {
        let mut by_owner: BTreeMap<OwnerId, Vec<Subscription>> = BTreeMap::new();
        for subscription in subscriptions {
            by_owner
                .entry(subscription.owner)
                .or_default()
                .push(subscription.clone());
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        for (owner, subscriptions) in &by_owner {
            Self::upsert_row(&mut *tx, *owner, subscriptions).await?;
        }
        tx.commit().await.map_err(backend)?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Subscription>, GatewayError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT owner_id, data FROM subscriptions ORDER BY owner_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut subscriptions = Vec::new();
        for row in rows {
            match serde_json::from_str::<Vec<Subscription>>(&row.data) {
                Ok(stored) => subscriptions.extend(stored),
                Err(e) => {
                    tracing::error!(
                        "[owner={}] Skipping unreadable subscriptions: {}",
                        row.owner_id,
                        e
                    );
                }
            }
        }

        Ok(subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use monitor::{Cursor, KeywordGroups};

    async fn repository() -> SubscriptionStore {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        SubscriptionStore::new(pool)
    }

    fn subscription(owner: OwnerId, title: &str) -> Subscription {
        Subscription {
            owner,
            title: title.to_string(),
            feed_url: format!("https://example.com/{}.xml", title),
            cursor: Cursor::new("https://example.com/1", "Episode 1"),
            include: KeywordGroups::parse("1080 or 720|web"),
            exclude: KeywordGroups::default(),
            sensitive: false,
            command: None,
            paused: false,
            tag: "@alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_owner_row() {
        let repo = repository().await;

        repo.upsert(1, &[subscription(1, "a"), subscription(1, "b")])
            .await
            .unwrap();
        repo.upsert(1, &[subscription(1, "b")]).await.unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "b");
        assert_eq!(loaded[0].include, KeywordGroups::parse("1080 or 720|web"));
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let repo = repository().await;
        repo.upsert_all(&[subscription(1, "a"), subscription(2, "b"), subscription(2, "c")])
            .await
            .unwrap();
        assert_eq!(repo.load_all().await.unwrap().len(), 3);

        repo.delete(2).await.unwrap();
        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].owner, 1);

        repo.delete_all().await.unwrap();
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_row_skipped() {
        let repo = repository().await;
        repo.upsert(1, &[subscription(1, "a")]).await.unwrap();
        sqlx::query("INSERT INTO subscriptions (owner_id, data) VALUES (2, 'not json')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].owner, 1);
    }
}
