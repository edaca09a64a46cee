//! HTML rendering of news cards, feed sections and the front page.
//!
//! Cards follow the site's Bootstrap markup and carry schema.org
//! `NewsArticle` microdata. Every interpolated value is HTML-escaped.
//!
//! # Containers
//!
//! Each feed renders into the element whose id is its `container_id`. A page
//! holds every container id once: when two sources share an id the first
//! source keeps it and the later ones are skipped with a warning.

use crate::fallback::FALLBACK_SOURCE;
use crate::models::{FeedOutcome, NewsItem, SourcedItem};
use crate::trends::Keyword;
use crate::utils::{escape_html, format_date_es, strip_html};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Characters of description kept on a card.
pub const EXCERPT_CHARS: usize = 150;

pub const NO_DESCRIPTION: &str = "Sin descripción disponible.";
pub const NO_NEWS: &str = "No se encontraron noticias en este momento.";
pub const FEATURED_CONTAINER: &str = "destacadas-container";
pub const BREAKING_CONTAINER: &str = "breaking-news-container";
pub const TRENDING_CONTAINER: &str = "trending-container";

/// Plain-text card excerpt of an HTML description.
///
/// Longer than [`EXCERPT_CHARS`] characters: the first [`EXCERPT_CHARS`]
/// characters followed by `"..."`. Otherwise the text as is.
pub fn excerpt(description: &str) -> String {
    let text = strip_html(description);
    if text.is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// Pick a default image for an item without one.
///
/// The choice depends only on the link, so re-rendering the same item shows
/// the same picture.
pub fn default_image<'a>(link: &str, images: &'a [String]) -> Option<&'a str> {
    if images.is_empty() {
        return None;
    }
    let hash = link
        .bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
    Some(images[(hash % images.len() as u64) as usize].as_str())
}

/// Render one `<article>` card.
pub fn render_card(item: &NewsItem, categoria: &str, fuente: &str, images: &[String]) -> String {
    let image = item
        .image_url
        .as_deref()
        .or_else(|| default_image(&item.link, images))
        .unwrap_or_default();
    let title = escape_html(&item.title);
    let image = escape_html(image);
    let link = escape_html(&item.link);
    let pub_date = escape_html(&item.pub_date);

    format!(
        r#"<div class="col">
  <article class="card h-100 news-card" itemscope itemtype="http://schema.org/NewsArticle">
    <div class="position-relative">
      <img src="{image}" class="card-img-top news-image" alt="{title}" loading="lazy" itemprop="image">
      <span class="badge category-badge">{categoria}</span>
      <span class="badge source-badge">{fuente}</span>
    </div>
    <div class="card-body d-flex flex-column">
      <h5 class="card-title news-headline" itemprop="headline">{title}</h5>
      <p class="card-text news-description flex-grow-1" itemprop="description">{excerpt}</p>
      <div class="mt-auto">
        <small class="text-muted"><i class="bi bi-clock"></i> {date}</small>
        <a href="{link}" class="btn btn-outline-warning btn-sm w-100" itemprop="url" target="_blank" rel="noopener">
          <i class="bi bi-arrow-right"></i> Leer completo
        </a>
      </div>
    </div>
    <meta itemprop="datePublished" content="{pub_date}" />
    <meta itemprop="dateModified" content="{pub_date}" />
    <div itemprop="publisher" itemscope itemtype="https://schema.org/Organization">
      <meta itemprop="name" content="{fuente}" />
    </div>
  </article>
</div>
"#,
        categoria = escape_html(categoria),
        fuente = escape_html(fuente),
        excerpt = escape_html(&excerpt(&item.description)),
        date = escape_html(&format_date_es(item.published_at())),
    )
}

fn no_news_alert() -> String {
    format!(r#"<div class="col-12"><div class="alert alert-warning">{NO_NEWS}</div></div>"#)
}

/// Render the section of one feed: at most `page_size` cards in its container.
pub fn render_section(outcome: &FeedOutcome, page_size: usize, images: &[String]) -> String {
    let source = outcome.source();
    let feed = outcome.feed();
    let fuente = if outcome.is_fallback() {
        FALLBACK_SOURCE
    } else {
        source.fuente.as_str()
    };

    let cards = if feed.items.is_empty() {
        no_news_alert()
    } else {
        feed.items
            .iter()
            .take(page_size)
            .map(|item| render_card(item, &source.categoria, fuente, images))
            .collect()
    };

    let reason = outcome
        .fallback_reason()
        .map(|r| format!(r#" data-fallback-reason="{}""#, escape_html(r)))
        .unwrap_or_default();

    format!(
        r#"<section id="{id}" class="news-section mb-5" data-feed="{feed_id}"{reason}>
  <h2 class="section-title">{title}</h2>
  <div class="row row-cols-1 row-cols-md-2 row-cols-lg-3 g-4">
{cards}  </div>
</section>
"#,
        id = escape_html(&source.container_id),
        feed_id = escape_html(&source.id),
        title = escape_html(&source.title),
    )
}

/// Render the "destacadas" row.
pub fn render_featured(items: &[SourcedItem], images: &[String]) -> String {
    let cards: String = if items.is_empty() {
        no_news_alert()
    } else {
        items
            .iter()
            .map(|s| {
                render_card(
                    &s.item,
                    s.categoria.as_deref().unwrap_or("Destacadas"),
                    s.fuente.as_deref().unwrap_or(&s.feed_title),
                    images,
                )
            })
            .collect()
    };
    format!(
        r#"<section id="{FEATURED_CONTAINER}" class="news-section mb-5">
  <h2 class="section-title">Noticias destacadas</h2>
  <div class="row row-cols-1 row-cols-md-2 row-cols-lg-3 g-4">
{cards}  </div>
</section>
"#
    )
}

/// Render the breaking-news ticker. Empty when there is nothing to show.
pub fn render_breaking(items: &[SourcedItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let links: String = items
        .iter()
        .map(|s| {
            format!(
                r#"    <li><span class="badge bg-danger">{fuente}</span> <a href="{link}" target="_blank" rel="noopener">{title}</a></li>
"#,
                fuente = escape_html(s.fuente.as_deref().unwrap_or(&s.feed_title)),
                link = escape_html(&s.item.link),
                title = escape_html(&s.item.title),
            )
        })
        .collect();
    format!(
        r#"<section id="{BREAKING_CONTAINER}" class="breaking-news mb-4">
  <h2 class="section-title"><i class="bi bi-lightning-fill"></i> Última hora</h2>
  <ul class="list-unstyled">
{links}  </ul>
</section>
"#
    )
}

/// Render the trending-keyword tags. Empty when there are no keywords.
pub fn render_trending(keywords: &[Keyword]) -> String {
    if keywords.is_empty() {
        return String::new();
    }
    let tags: String = keywords
        .iter()
        .map(|k| {
            let category = k
                .category()
                .map(|c| format!(r#" data-category="{}""#, escape_html(c)))
                .unwrap_or_default();
            format!(
                r#"    <span class="badge trending-tag"{category}>#{word} <small>{count}</small></span>
"#,
                word = escape_html(&k.word),
                count = k.count,
            )
        })
        .collect();
    format!(
        r#"<section id="{TRENDING_CONTAINER}" class="trending mb-4">
  <h2 class="section-title"><i class="bi bi-graph-up-arrow"></i> Tendencias</h2>
  <div class="d-flex flex-wrap gap-2">
{tags}  </div>
</section>
"#
    )
}

/// Render a full page.
///
/// `head_meta` is inserted verbatim into `<head>`, see
/// [`crate::seo::render_meta_tags`]. `lead` is already rendered HTML placed
/// above the featured row (the ticker and trending tags on the home page).
pub fn render_page(
    outcomes: &[FeedOutcome],
    featured: &[SourcedItem],
    head_meta: &str,
    lead: &str,
    page_size: usize,
    images: &[String],
) -> String {
    let mut seen: HashSet<&str> = HashSet::from([FEATURED_CONTAINER]);
    let mut sections = lead.to_string();
    sections.push_str(&render_featured(featured, images));

    for outcome in outcomes {
        let source = outcome.source();
        if !seen.insert(source.container_id.as_str()) {
            warn!(
                feed = %source.id,
                container = %source.container_id,
                "Container already rendered by another feed; skipping"
            );
            continue;
        }
        sections.push_str(&render_section(outcome, page_size, images));
    }
    debug!(containers = seen.len(), "Rendered page sections");

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{head_meta}
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css">
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap-icons@1.11.1/font/bootstrap-icons.css">
<style>
  body {{ background: #111; color: #eee; }}
  .news-card {{ border: none; border-radius: 12px; overflow: hidden; background: #1b1b1b; }}
  .news-image {{ height: 200px; object-fit: cover; }}
  .news-headline, .section-title {{ color: #bfa046; font-weight: 700; }}
  .category-badge {{ position: absolute; top: 12px; left: 12px; background: #bfa046; color: #111; }}
  .source-badge {{ position: absolute; top: 12px; right: 12px; background: rgba(255,255,255,0.9); color: #111; }}
</style>
</head>
<body>
<main class="container py-4">
{sections}</main>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feed, FeedSource};

    fn item(i: usize) -> NewsItem {
        NewsItem {
            title: format!("Noticia {i}"),
            description: format!("<p>Descripción {i}</p>"),
            link: format!("https://example.com/{i}"),
            pub_date: "Wed, 15 Oct 2025 10:05:00 GMT".to_string(),
            image_url: None,
        }
    }

    fn source(id: &str, container_id: &str) -> FeedSource {
        FeedSource {
            id: id.to_string(),
            title: format!("Feed {id}"),
            url: format!("https://example.com/{id}.xml"),
            container_id: container_id.to_string(),
            fuente: "BBC".to_string(),
            categoria: "Internacional".to_string(),
        }
    }

    fn loaded(id: &str, container_id: &str, items: Vec<NewsItem>) -> FeedOutcome {
        FeedOutcome::Loaded {
            source: source(id, container_id),
            feed: Feed {
                items,
                ..Feed::default()
            },
        }
    }

    fn images() -> Vec<String> {
        vec!["https://img/a.jpg".to_string(), "https://img/b.jpg".to_string()]
    }

    #[test]
    fn test_excerpt_long_text_is_cut() {
        for len in [151, 200, 1000] {
            let text = "x".repeat(len);
            let out = excerpt(&text);
            assert_eq!(out.chars().count(), EXCERPT_CHARS + 3);
            assert!(out.ends_with("..."));
        }
    }

    #[test]
    fn test_excerpt_short_text_unchanged() {
        for len in [1, 100, 150] {
            let text = "y".repeat(len);
            assert_eq!(excerpt(&text), text);
        }
    }

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let text = "ñ".repeat(160);
        assert_eq!(excerpt(&text), format!("{}...", "ñ".repeat(150)));
    }

    #[test]
    fn test_excerpt_strips_tags_and_defaults() {
        assert_eq!(excerpt("<p>Hola <b>mundo</b></p>"), "Hola mundo");
        assert_eq!(excerpt(""), NO_DESCRIPTION);
        assert_eq!(excerpt("<img src=\"x\">"), NO_DESCRIPTION);
    }

    #[test]
    fn test_default_image_is_stable() {
        let imgs = images();
        let a = default_image("https://example.com/1", &imgs);
        assert!(a.is_some());
        assert_eq!(a, default_image("https://example.com/1", &imgs));
        assert_eq!(default_image("x", &[]), None);
    }

    #[test]
    fn test_card_escapes_and_formats() {
        let mut it = item(1);
        it.title = "<script>alert(1)</script>".to_string();
        let html = render_card(&it, "Tecnología", "BBC", &images());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("15 oct, 10:05"));
        assert!(html.contains("itemtype=\"http://schema.org/NewsArticle\""));
        assert!(html.contains("https://img/"));
    }

    #[test]
    fn test_card_prefers_item_image() {
        let mut it = item(1);
        it.image_url = Some("https://cdn/own.jpg".to_string());
        assert!(render_card(&it, "c", "f", &images()).contains("https://cdn/own.jpg"));
    }

    #[test]
    fn test_section_caps_cards() {
        let outcome = loaded("a", "a-container", (0..10).map(item).collect());
        let html = render_section(&outcome, 6, &images());
        assert_eq!(html.matches("<article").count(), 6);
        assert!(html.contains("id=\"a-container\""));
    }

    #[test]
    fn test_empty_section_shows_alert() {
        let outcome = loaded("a", "a-container", vec![]);
        let html = render_section(&outcome, 6, &images());
        assert!(html.contains(NO_NEWS));
        assert_eq!(html.matches("<article").count(), 0);
    }

    #[test]
    fn test_fallback_section_carries_reason() {
        let outcome = FeedOutcome::Fallback {
            source: source("a", "a-container"),
            feed: Feed {
                items: vec![item(1)],
                ..Feed::default()
            },
            reason: "HTTP 503 from \"proxy\" & more".to_string(),
        };
        let html = render_section(&outcome, 6, &images());
        assert!(html.contains(r#"data-fallback-reason="HTTP 503 from &quot;proxy&quot; &amp; more""#));
        assert!(html.contains(FALLBACK_SOURCE));

        let live = render_section(&loaded("b", "b-container", vec![item(1)]), 6, &images());
        assert!(!live.contains("data-fallback-reason"));
    }

    #[test]
    fn test_page_never_cross_writes_containers() {
        let outcomes = vec![
            loaded("a", "shared", vec![item(1)]),
            loaded("b", "shared", vec![item(2)]),
            loaded("c", "own", vec![item(3)]),
        ];
        let html = render_page(&outcomes, &[], "<title>t</title>", "", 6, &images());
        assert_eq!(html.matches("id=\"shared\"").count(), 1);
        assert!(html.contains("Noticia 1"));
        assert!(!html.contains("Noticia 2"));
        assert!(html.contains("Noticia 3"));
        assert!(html.contains("<title>t</title>"));
    }

    #[test]
    fn test_page_sections_hold_only_their_feed() {
        let outcomes = vec![
            loaded("a", "a-container", vec![item(1)]),
            loaded("b", "b-container", vec![item(2)]),
        ];
        let html = render_page(&outcomes, &[], "", "", 6, &images());
        let a_start = html.find("id=\"a-container\"").unwrap();
        let b_start = html.find("id=\"b-container\"").unwrap();
        let a_section = &html[a_start..b_start];
        assert!(a_section.contains("Noticia 1"));
        assert!(!a_section.contains("Noticia 2"));
    }

    #[test]
    fn test_breaking_ticker_lists_items() {
        let items = vec![SourcedItem {
            item: item(1),
            feed_title: "BBC World".to_string(),
            categoria: None,
            fuente: Some("BBC".to_string()),
        }];
        let html = render_breaking(&items);
        assert!(html.contains(&format!("id=\"{BREAKING_CONTAINER}\"")));
        assert!(html.contains("Noticia 1"));
        assert!(html.contains("https://example.com/1"));
        assert_eq!(render_breaking(&[]), "");
    }

    #[test]
    fn test_trending_tags_carry_category() {
        let keywords = vec![
            Keyword { word: "elecciones".to_string(), count: 4 },
            Keyword { word: "<b>".to_string(), count: 1 },
        ];
        let html = render_trending(&keywords);
        assert!(html.contains(r#"data-category="política">#elecciones <small>4</small>"#));
        assert!(html.contains("#&lt;b&gt;"));
        assert_eq!(render_trending(&[]), "");
    }

    #[test]
    fn test_page_places_lead_above_featured() {
        let lead = render_trending(&[Keyword { word: "messi".to_string(), count: 2 }]);
        let html = render_page(&[], &[], "", &lead, 6, &images());
        let lead_at = html.find(TRENDING_CONTAINER).unwrap();
        let featured_at = html.find(FEATURED_CONTAINER).unwrap();
        assert!(lead_at < featured_at);
    }
}
