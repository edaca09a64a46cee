//! Loading every configured feed and picking the featured row.
//!
//! Feeds load in batches of `batch_size`, with a pause between batches to
//! stay friendly with the free proxies. Within a batch the loads run
//! concurrently. A feed that cannot be fetched or parsed degrades to its
//! category's fallback content; [`Aggregator::load_all`] never fails.

use crate::cache::FeedCache;
use crate::config::AppConfig;
use crate::error::FeedError;
use crate::fallback::fallback_feed;
use crate::fetcher::FetchXml;
use crate::models::{Feed, FeedOutcome, FeedSource, SourcedItem};
use crate::parser::parse_feed;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

pub struct Aggregator<F> {
    fetcher: F,
    cache: Arc<FeedCache>,
    max_items: usize,
    batch_size: usize,
    batch_delay: Duration,
}

impl<F> Aggregator<F>
where
    F: FetchXml,
{
    pub fn new(fetcher: F, cache: Arc<FeedCache>, config: &AppConfig) -> Self {
        Self {
            fetcher,
            cache,
            max_items: config.max_items,
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay(),
        }
    }

    /// Fetch and parse one feed, going through the cache.
    #[instrument(level = "debug", skip(self), fields(feed = %source.id))]
    pub async fn load_feed(&self, source: &FeedSource) -> Result<Feed, FeedError> {
        self.cache
            .get_or_load(&source.id, || async {
                let xml = self.fetcher.fetch_xml(&source.url).await?;
                let feed = parse_feed(&xml, self.max_items)?;
                Ok::<_, FeedError>(feed)
            })
            .await
    }

    /// Load one feed, substituting fallback content on failure.
    pub async fn load_outcome(&self, source: &FeedSource) -> FeedOutcome {
        match self.load_feed(source).await {
            Ok(feed) => {
                info!(feed = %source.id, items = feed.items.len(), "Feed loaded");
                FeedOutcome::Loaded {
                    source: source.clone(),
                    feed,
                }
            }
            Err(e) => {
                warn!(feed = %source.id, error = %e, "Feed failed; using fallback content");
                FeedOutcome::Fallback {
                    source: source.clone(),
                    feed: fallback_feed(source),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Load every source, in batches, returning outcomes in `sources` order.
    #[instrument(level = "info", skip_all, fields(feeds = sources.len()))]
    pub async fn load_all(&self, sources: &[FeedSource]) -> Vec<FeedOutcome> {
        let t0 = Instant::now();
        let mut outcomes: Vec<(usize, FeedOutcome)> = Vec::with_capacity(sources.len());

        for (batch_no, batch) in sources.chunks(self.batch_size).enumerate() {
            if batch_no > 0 && !self.batch_delay.is_zero() {
                sleep(self.batch_delay).await;
            }
            let offset = batch_no * self.batch_size;
            let batch_results: Vec<(usize, FeedOutcome)> = stream::iter(batch.iter().enumerate())
                .map(|(i, source)| async move { (offset + i, self.load_outcome(source).await) })
                .buffer_unordered(self.batch_size)
                .collect()
                .await;
            outcomes.extend(batch_results);
        }

        outcomes.sort_by_key(|(i, _)| *i);
        let outcomes: Vec<FeedOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();

        let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
        info!(
            loaded = outcomes.len() - fallbacks,
            fallbacks,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "All feeds processed"
        );
        outcomes
    }
}

/// The `limit` most recent live items across all outcomes, newest first.
///
/// Fallback feeds are skipped. Items whose date does not parse sort last.
/// Duplicate links keep their first occurrence.
pub fn featured(outcomes: &[FeedOutcome], limit: usize) -> Vec<SourcedItem> {
    outcomes
        .iter()
        .filter(|o| !o.is_fallback())
        .flat_map(|o| {
            let source = o.source();
            o.feed().items.iter().map(move |item| SourcedItem {
                item: item.clone(),
                feed_title: source.title.clone(),
                categoria: Some(source.categoria.clone()),
                fuente: Some(source.fuente.clone()),
            })
        })
        .unique_by(|s| s.item.link.clone())
        .sorted_by_key(|s| Reverse(s.item.published_at()))
        .take(limit)
        .collect()
}
