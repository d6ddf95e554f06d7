use std::fmt;

use rss::FeedEntry;
use serde::{Deserialize, Serialize};

use crate::template::CommandTemplate;

/// User identifier owning a set of subscriptions
pub type OwnerId = i64;

/// Identity of the most recently observed head entry of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub last_link: String,
    pub last_title: String,
}

impl Cursor {
    pub fn new(last_link: impl Into<String>, last_title: impl Into<String>) -> Self {
        Self {
            last_link: last_link.into(),
            last_title: last_title.into(),
        }
    }

    pub fn from_entry(entry: &FeedEntry) -> Self {
        Self::new(entry.effective_link(), entry.title.clone())
    }

    /// Both link and title must match.
    pub fn matches(&self, entry: &FeedEntry) -> bool {
        self.last_link == entry.effective_link() && self.last_title == entry.title
    }
}

/// Ordered keyword groups. Each group is a set of alternative keywords.
///
/// Written as `kw1 or kw2|kw3`: groups separated by `|`, alternatives by
/// ` or `.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordGroups(Vec<Vec<String>>);

impl KeywordGroups {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self(groups)
    }

    pub fn parse(expr: &str) -> Self {
        let groups = expr
            .split('|')
            .map(|group| {
                group
                    .split(" or ")
                    .map(str::trim)
                    .filter(|keyword| !keyword.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();
        Self(groups)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.0
    }
}

impl fmt::Display for KeywordGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.0.iter().map(|g| g.join(" or ")).collect();
        write!(f, "{}", groups.join("|"))
    }
}

/// A named, owner-scoped feed watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub owner: OwnerId,
    /// Unique within the owner's subscriptions, case-sensitive
    pub title: String,
    pub feed_url: String,
    pub cursor: Cursor,
    #[serde(default)]
    pub include: KeywordGroups,
    #[serde(default)]
    pub exclude: KeywordGroups,
    /// Case-sensitive keyword matching
    #[serde(default)]
    pub sensitive: bool,
    /// Command dispatched for new entries; default notification when unset
    #[serde(default)]
    pub command: Option<CommandTemplate>,
    #[serde(default)]
    pub paused: bool,
    /// Attribution label appended to every dispatched message
    pub tag: String,
}

/// Partial update applied by an edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPatch {
    pub command: Option<Option<CommandTemplate>>,
    pub include: Option<KeywordGroups>,
    pub exclude: Option<KeywordGroups>,
    pub sensitive: Option<bool>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        self.command.is_none()
            && self.include.is_none()
            && self.exclude.is_none()
            && self.sensitive.is_none()
    }

    pub fn apply(&self, subscription: &mut Subscription) {
        if let Some(command) = &self.command {
            subscription.command = command.clone();
        }
        if let Some(include) = &self.include {
            subscription.include = include.clone();
        }
        if let Some(exclude) = &self.exclude {
            subscription.exclude = exclude.clone();
        }
        if let Some(sensitive) = self.sensitive {
            subscription.sensitive = sensitive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_groups_parse() {
        let groups = KeywordGroups::parse("1080 or 720|x265");
        assert_eq!(
            groups.groups(),
            &[
                vec!["1080".to_string(), "720".to_string()],
                vec!["x265".to_string()]
            ]
        );
        assert_eq!(groups.to_string(), "1080 or 720|x265");
    }

    #[test]
    fn test_keyword_groups_drop_blank_keywords() {
        let groups = KeywordGroups::parse("a or  | or b");
        assert_eq!(
            groups.groups(),
            &[vec!["a".to_string()], vec!["b".to_string()]]
        );
    }

    #[test]
    fn test_cursor_requires_link_and_title() {
        let entry = FeedEntry::new("Episode 1", "https://example.com/1");
        assert!(Cursor::new("https://example.com/1", "Episode 1").matches(&entry));
        assert!(!Cursor::new("https://example.com/1", "Episode 1 v2").matches(&entry));
        assert!(!Cursor::new("https://example.com/2", "Episode 1").matches(&entry));
    }

    #[test]
    fn test_cursor_uses_secondary_link() {
        let entry = FeedEntry::new("Episode 1", "https://example.com/1")
            .with_secondary_link("magnet:?xt=1");
        let cursor = Cursor::from_entry(&entry);
        assert_eq!(cursor.last_link, "magnet:?xt=1");
        assert!(cursor.matches(&entry));
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut sub = Subscription {
            owner: 1,
            title: "show".into(),
            feed_url: "https://example.com/rss".into(),
            cursor: Cursor::default(),
            include: KeywordGroups::parse("1080"),
            exclude: KeywordGroups::parse("cam"),
            sensitive: false,
            command: CommandTemplate::parse("/mirror -up remote"),
            paused: false,
            tag: "@alice".into(),
        };

        let patch = SubscriptionPatch {
            command: Some(None),
            sensitive: Some(true),
            ..Default::default()
        };
        patch.apply(&mut sub);

        assert_eq!(sub.command, None);
        assert!(sub.sensitive);
        assert_eq!(sub.include, KeywordGroups::parse("1080"));
        assert_eq!(sub.exclude, KeywordGroups::parse("cam"));
    }
}
