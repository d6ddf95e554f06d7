use async_trait::async_trait;
use rss::{Feed, RssClient};

/// Where feeds come from
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> rss::Result<Feed>;
}

#[async_trait]
impl FeedSource for RssClient {
    async fn fetch(&self, url: &str) -> rss::Result<Feed> {
        RssClient::fetch(self, url).await
    }
}
