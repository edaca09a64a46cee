//! Keyword search over the loaded news items.
//!
//! # Scoring
//!
//! The query is lowercased and split on whitespace. For every term an item
//! scores:
//!
//! | Match | Points |
//! |-------|--------|
//! | term in title | 10 |
//! | term in description | 5 |
//! | term in `title + " " + description` | 2 |
//!
//! Items scoring zero are dropped, the rest sorted by score (ties keep corpus
//! order) and cut to [`MAX_RESULTS`].
//!
//! # Corpus
//!
//! Live items of the last build's snapshot plus the generated-article list.
//! When both are empty, the two basic BBC feeds are fetched instead.

use crate::fetcher::FetchXml;
use crate::models::{FeedSource, Snapshot, SourcedItem};
use crate::outputs::articles::ArticleList;
use crate::parser::parse_feed;
use crate::utils::{escape_html, format_date_es, strip_html};
use regex::RegexBuilder;
use std::fmt::Write;
use tracing::{debug, info, instrument, warn};

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_RESULTS: usize = 8;
/// Items taken from each basic feed.
pub const BASIC_FEED_ITEMS: usize = 10;
const RESULT_EXCERPT_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub item: SourcedItem,
    pub score: u32,
}

/// Lowercased search terms, or none when the query is too short.
pub fn terms(query: &str) -> Vec<String> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

fn score(item: &SourcedItem, terms: &[String]) -> u32 {
    let title = item.item.title.to_lowercase();
    let description = item.item.description.to_lowercase();
    let content = format!("{title} {description}");

    terms
        .iter()
        .map(|term| {
            let mut points = 0;
            if title.contains(term.as_str()) {
                points += 10;
            }
            if description.contains(term.as_str()) {
                points += 5;
            }
            if content.contains(term.as_str()) {
                points += 2;
            }
            points
        })
        .sum()
}

/// Score, filter, sort and cut `items` for `query`.
pub fn search_items(items: &[SourcedItem], query: &str) -> Vec<SearchResult> {
    let terms = terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<SearchResult> = items
        .iter()
        .filter_map(|item| {
            let score = score(item, &terms);
            (score > 0).then(|| SearchResult {
                item: item.clone(),
                score,
            })
        })
        .collect();
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(MAX_RESULTS);
    results
}

/// Wrap case-insensitive matches of each query term in `<mark>`, HTML-escaping
/// the text in and around the marks.
///
/// Matching runs on the raw text, so a term never lands inside an entity.
pub fn highlight(text: &str, query: &str) -> String {
    let mut terms: Vec<String> = query.split_whitespace().map(regex::escape).collect();
    if terms.is_empty() {
        return escape_html(text).into_owned();
    }
    // Longest first, so one term inside another still marks the longer match.
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));

    let re = match RegexBuilder::new(&terms.join("|")).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "Could not build highlight pattern");
            return escape_html(text).into_owned();
        }
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&escape_html(&text[last..m.start()]));
        out.push_str("<mark>");
        out.push_str(&escape_html(m.as_str()));
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

/// Plain-text description shortened for a result line.
pub fn result_excerpt(description: &str) -> String {
    let text = strip_html(description);
    match text.char_indices().nth(RESULT_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// Feeds searched when nothing else is available.
pub fn basic_feeds() -> Vec<FeedSource> {
    let bbc = |id: &str, title: &str, url: &str, categoria: &str| FeedSource {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        container_id: format!("{id}-container"),
        fuente: "BBC".to_string(),
        categoria: categoria.to_string(),
    };
    vec![
        bbc("bbc-world", "BBC World News", "https://feeds.bbci.co.uk/news/world/rss.xml", "Internacional"),
        bbc("bbc-tech", "BBC Technology", "https://feeds.bbci.co.uk/news/technology/rss.xml", "Tecnología"),
    ]
}

async fn load_basic_feeds<F: FetchXml>(fetcher: &F) -> Vec<SourcedItem> {
    let mut items = Vec::new();
    for source in basic_feeds() {
        let feed = match fetcher.fetch_xml(&source.url).await {
            Ok(xml) => parse_feed(&xml, BASIC_FEED_ITEMS).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match feed {
            Ok(feed) => items.extend(feed.items.into_iter().map(|item| SourcedItem {
                item,
                feed_title: source.title.clone(),
                categoria: Some(source.categoria.clone()),
                fuente: Some(source.fuente.clone()),
            })),
            Err(e) => warn!(feed = %source.id, error = %e, "Could not load feed for search"),
        }
    }
    items
}

/// Build the searchable corpus.
#[instrument(level = "info", skip_all)]
pub async fn collect_corpus<F: FetchXml>(
    snapshot: Option<&Snapshot>,
    articles: &ArticleList,
    fetcher: &F,
) -> Vec<SourcedItem> {
    let mut items: Vec<SourcedItem> = snapshot.map(Snapshot::live_items).unwrap_or_default();
    items.extend(articles.articles.iter().map(|a| a.to_sourced_item()));
    debug!(items = items.len(), "Corpus from snapshot and article list");

    if items.is_empty() {
        info!("Nothing cached; fetching basic feeds");
        items = load_basic_feeds(fetcher).await;
    }
    items
}

/// Terminal listing of results.
pub fn render_results_text(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return format!("No se encontraron resultados para \"{query}\"\n");
    }
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {} [{}]", i + 1, r.item.item.title, r.score);
        let _ = writeln!(out, "   {}", result_excerpt(&r.item.item.description));
        let _ = writeln!(
            out,
            "   {} · {} · {}",
            r.item.feed_title,
            format_date_es(r.item.item.published_at()),
            r.item.item.link
        );
    }
    out
}

/// Result list as HTML `list-group` items with highlighted matches.
pub fn render_results_html(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return format!(
            r#"<div class="list-group-item text-center text-muted"><i class="bi bi-search"></i> No se encontraron resultados para "{}"</div>"#,
            escape_html(query)
        );
    }
    results
        .iter()
        .map(|r| {
            let item = &r.item.item;
            format!(
                r#"<a href="{link}" class="list-group-item list-group-item-action" target="_blank" rel="noopener">
  <h6 class="mb-1">{title}</h6>
  <p class="mb-1">{description}</p>
  <small><i class="bi bi-newspaper"></i> {source} <span class="ms-2"><i class="bi bi-clock"></i> {date}</span></small>
</a>
"#,
                link = escape_html(&item.link),
                title = highlight(&item.title, query),
                description = highlight(&result_excerpt(&item.description), query),
                source = escape_html(&r.item.feed_title),
                date = escape_html(&format_date_es(item.published_at())),
            )
        })
        .collect()
}
