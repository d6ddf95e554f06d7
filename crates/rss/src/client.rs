use reqwest::Client;

use crate::error::RssError;
use crate::models::Feed;
use crate::parsers::parse_feed;

/// RSS/Atom feed fetcher client
#[derive(Clone)]
pub struct RssClient {
    client: Client,
}

impl RssClient {
    /// Create a new RssClient with a default reqwest Client
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new RssClient with a custom reqwest Client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and parse a feed
    ///
    /// # Example
    /// ```no_run
    /// use rss::RssClient;
    ///
    /// # async fn example() -> rss::Result<()> {
    /// let client = RssClient::new();
    /// let feed = client.fetch("https://example.com/feed.xml").await?;
    ///
    /// for entry in feed.entries {
    ///     println!("{} -> {}", entry.title, entry.effective_link());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(&self, url: &str) -> crate::Result<Feed> {
        tracing::debug!("Fetching feed from: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(RssError::Status {
                status,
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let feed = parse_feed(&bytes)?;

        tracing::debug!("Parsed {} entries from {}", feed.entries.len(), url);
        Ok(feed)
    }
}

impl Default for RssClient {
    fn default() -> Self {
        Self::new()
    }
}
