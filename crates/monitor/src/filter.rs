//! Keyword filtering of entry titles.
//!
//! Inclusion groups combine with AND, keywords inside a group with OR. Any
//! keyword of any exclusion group rejects the title.

use crate::models::KeywordGroups;

/// Check whether `title` passes the include and exclude keyword groups.
///
/// An empty include list always passes. Matching is a plain substring test,
/// case-insensitive unless `sensitive` is set.
pub fn matches(
    title: &str,
    include: &KeywordGroups,
    exclude: &KeywordGroups,
    sensitive: bool,
) -> bool {
    let haystack = if sensitive {
        title.to_string()
    } else {
        title.to_lowercase()
    };

    let contains = |keyword: &str| {
        if sensitive {
            haystack.contains(keyword)
        } else {
            haystack.contains(&keyword.to_lowercase())
        }
    };

    let included = include
        .groups()
        .iter()
        .all(|group| group.iter().any(|k| contains(k.as_str())));
    if !included {
        return false;
    }

    !exclude
        .groups()
        .iter()
        .any(|group| group.iter().any(|k| contains(k.as_str())))
}
