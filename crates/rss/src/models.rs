use serde::{Deserialize, Serialize};

/// A parsed feed, entries ordered as published (newest first for
/// well-behaved sources).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    /// Channel title, if the feed declares one
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    /// The most recent entry
    pub fn head(&self) -> Option<&FeedEntry> {
        self.entries.first()
    }
}

/// Single feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Title of the entry
    pub title: String,
    /// Primary link (`<link>` for RSS, first `<link href>` for Atom)
    pub link: String,
    /// Secondary link, usually an enclosure such as a torrent or magnet
    pub secondary_link: Option<String>,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            secondary_link: None,
        }
    }

    pub fn with_secondary_link(mut self, link: impl Into<String>) -> Self {
        self.secondary_link = Some(link.into());
        self
    }

    /// The link used for dedup and dispatch: the secondary link when the
    /// source provides one, the primary link otherwise.
    pub fn effective_link(&self) -> &str {
        self.secondary_link.as_deref().unwrap_or(&self.link)
    }
}
