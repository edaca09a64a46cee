//! Data models for feed sources, parsed feeds and their on-disk snapshot.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedSource`]: A configured RSS endpoint and the page container it fills
//! - [`NewsItem`]: One normalized `<item>` of a feed
//! - [`Feed`]: A parsed RSS channel
//! - [`FeedOutcome`]: The result of loading a source, live or fallback
//! - [`Snapshot`]: Every loaded feed of one build, serialized to JSON
//!
//! Field names serialize in camelCase to stay compatible with the JSON files
//! the site already publishes (`containerId`, `pubDate`, `imageUrl`).

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A configured RSS endpoint.
///
/// Sources are static: they come from the YAML configuration (or the
/// built-in table) and are never persisted on their own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    /// Unique id, also the cache key (e.g. `"bbc-world"`).
    pub id: String,
    /// Human-readable feed title.
    pub title: String,
    /// The RSS URL.
    pub url: String,
    /// Id of the page section this feed renders into.
    pub container_id: String,
    /// Outlet label shown on the source badge (e.g. `"BBC"`).
    pub fuente: String,
    /// Category label shown on the category badge (e.g. `"Tecnología"`).
    pub categoria: String,
}

/// One normalized `<item>` element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Publication date as published by the feed (RFC 822 in most feeds).
    pub pub_date: String,
    pub image_url: Option<String>,
}

impl NewsItem {
    /// Parse `pub_date` as RFC 2822 or RFC 3339.
    ///
    /// Returns `None` for dates neither format accepts; callers sort those last.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.pub_date.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

/// A parsed RSS channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<NewsItem>,
}

/// The result of loading one source.
///
/// A source never "fails" from the page's point of view: when every fetch
/// attempt is exhausted it degrades to [`FeedOutcome::Fallback`] carrying
/// static items and the reason the live load failed.
#[derive(Debug, Clone)]
pub enum FeedOutcome {
    Loaded { source: FeedSource, feed: Feed },
    Fallback { source: FeedSource, feed: Feed, reason: String },
}

impl FeedOutcome {
    pub fn source(&self) -> &FeedSource {
        match self {
            FeedOutcome::Loaded { source, .. } | FeedOutcome::Fallback { source, .. } => source,
        }
    }

    pub fn feed(&self) -> &Feed {
        match self {
            FeedOutcome::Loaded { feed, .. } | FeedOutcome::Fallback { feed, .. } => feed,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FeedOutcome::Fallback { .. })
    }

    /// Why the live load failed, for fallback outcomes.
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            FeedOutcome::Loaded { .. } => None,
            FeedOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// A news item together with the source it came from.
///
/// Used wherever items of several feeds are mixed: featured news, search
/// results and the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcedItem {
    pub item: NewsItem,
    /// Label of the feed (or article list) the item came from.
    pub feed_title: String,
    pub categoria: Option<String>,
    pub fuente: Option<String>,
}

/// One feed inside a [`Snapshot`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotFeed {
    pub source: FeedSource,
    pub feed: Feed,
    /// `true` when `feed` holds static fallback content.
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Every feed loaded by one `build`, written to disk as JSON.
///
/// This is the persistent stand-in for the in-memory feed cache: `search`
/// and `sitemap` read it instead of re-fetching every feed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub feeds: Vec<SnapshotFeed>,
}

impl Snapshot {
    pub fn from_outcomes(outcomes: &[FeedOutcome]) -> Self {
        Snapshot {
            generated_at: Utc::now(),
            feeds: outcomes
                .iter()
                .map(|o| SnapshotFeed {
                    source: o.source().clone(),
                    feed: o.feed().clone(),
                    fallback: o.is_fallback(),
                    fallback_reason: o.fallback_reason().map(str::to_string),
                })
                .collect(),
        }
    }

    /// Items of live (non-fallback) feeds, tagged with their source.
    pub fn live_items(&self) -> Vec<SourcedItem> {
        self.feeds
            .iter()
            .filter(|f| !f.fallback)
            .flat_map(|f| {
                f.feed.items.iter().map(move |item| SourcedItem {
                    item: item.clone(),
                    feed_title: f.source.title.clone(),
                    categoria: Some(f.source.categoria.clone()),
                    fuente: Some(f.source.fuente.clone()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str) -> FeedSource {
        FeedSource {
            id: id.to_string(),
            title: "BBC World News".to_string(),
            url: "https://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
            container_id: "bbc-mundo-container".to_string(),
            fuente: "BBC".to_string(),
            categoria: "Internacional".to_string(),
        }
    }

    fn item(title: &str, pub_date: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: "desc".to_string(),
            link: "https://example.com/a".to_string(),
            pub_date: pub_date.to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_feed_source_camel_case() {
        let json = serde_json::to_string(&source("bbc-world")).unwrap();
        assert!(json.contains("\"containerId\":\"bbc-mundo-container\""));
    }

    #[test]
    fn test_news_item_field_names() {
        let json = serde_json::to_string(&item("t", "d")).unwrap();
        assert!(json.contains("\"pubDate\""));
        assert!(json.contains("\"imageUrl\":null"));
    }

    #[test]
    fn test_published_at_rfc2822() {
        let i = item("t", "Wed, 15 Oct 2025 10:30:00 GMT");
        let dt = i.published_at().unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-10-15T10:30:00+00:00");
    }

    #[test]
    fn test_published_at_rfc3339() {
        let i = item("t", "2025-10-15T10:30:00Z");
        assert!(i.published_at().is_some());
    }

    #[test]
    fn test_published_at_garbage() {
        assert!(item("t", "ayer").published_at().is_none());
    }

    #[test]
    fn test_snapshot_live_items_skip_fallback() {
        let outcomes = vec![
            FeedOutcome::Loaded {
                source: source("a"),
                feed: Feed {
                    items: vec![item("live", "")],
                    ..Feed::default()
                },
            },
            FeedOutcome::Fallback {
                source: source("b"),
                feed: Feed {
                    items: vec![item("canned", "")],
                    ..Feed::default()
                },
                reason: "all proxies failed".to_string(),
            },
        ];
        let snapshot = Snapshot::from_outcomes(&outcomes);
        assert_eq!(snapshot.feeds.len(), 2);
        assert!(snapshot.feeds[1].fallback);
        assert_eq!(snapshot.feeds[0].fallback_reason, None);
        assert_eq!(snapshot.feeds[1].fallback_reason.as_deref(), Some("all proxies failed"));

        let live = snapshot.live_items();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].item.title, "live");
        assert_eq!(live[0].fuente.as_deref(), Some("BBC"));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = Snapshot::from_outcomes(&[]);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert!(back.feeds.is_empty());
    }
}
