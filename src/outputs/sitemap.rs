//! `sitemap.xml` and `robots.txt` generation.
//!
//! The sitemap lists the pages `build` writes (one per [`Route`]) followed by
//! one canonical URL per live news item, with the Google News and image
//! extensions:
//!
//! ```text
//! {base}/noticia/{categoria}/{YYYY-MM-DD}/{slug}.html
//! ```
//!
//! At most [`MAX_URLS`] entries are written.

use crate::models::SourcedItem;
use crate::seo::Route;
use crate::settings::AdminSettings;
use crate::utils::{escape_xml, slugify};
use chrono::{DateTime, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const MAX_URLS: usize = 1000;
pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const PUBLICATION_NAME: &str = "HGARUNA News";

/// Priority and changefreq of a route's page.
fn page_schedule(route: Route) -> (&'static str, &'static str) {
    match route {
        Route::Home => ("1.0", "daily"),
        Route::Deportes | Route::Tecnologia | Route::Ultimo => ("0.9", "hourly"),
        Route::Cultura | Route::Autos => ("0.8", "daily"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsInfo {
    pub title: String,
    pub publication_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: String,
    pub priority: String,
    pub news: Option<NewsInfo>,
    pub image: Option<String>,
}

fn rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn static_entries(base_url: &str, now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let base = base_url.trim_end_matches('/');
    Route::ALL
        .iter()
        .map(|&route| (route.path(), page_schedule(route)))
        .map(|(path, (priority, changefreq))| SitemapEntry {
            loc: format!("{base}{path}"),
            lastmod: rfc3339(now),
            changefreq: changefreq.to_string(),
            priority: priority.to_string(),
            news: None,
            image: None,
        })
        .collect()
}

/// Canonical site URL of a news item.
///
/// Items without a parseable date are filed under `now`'s date; items
/// without a category under `noticias`.
pub fn news_url(base_url: &str, item: &SourcedItem, now: DateTime<Utc>) -> String {
    let category = item
        .categoria
        .as_deref()
        .map(slugify)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "noticias".to_string());
    let date = item
        .item
        .published_at()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(now)
        .format("%Y-%m-%d");
    let slug = match slugify(&item.item.title) {
        s if s.is_empty() => "noticia".to_string(),
        s => s,
    };
    format!("{}/noticia/{category}/{date}/{slug}.html", base_url.trim_end_matches('/'))
}

fn news_entry(base_url: &str, item: &SourcedItem, settings: &AdminSettings, now: DateTime<Utc>) -> SitemapEntry {
    let published = rfc3339(item.item.published_at().map(|d| d.with_timezone(&Utc)).unwrap_or(now));
    SitemapEntry {
        loc: news_url(base_url, item, now),
        lastmod: published.clone(),
        changefreq: settings.sitemap_changefreq.clone(),
        priority: settings.sitemap_priority.clone(),
        news: Some(NewsInfo {
            title: item.item.title.clone(),
            publication_date: published,
        }),
        image: item.item.image_url.clone(),
    }
}

/// Static pages, then one entry per item, capped at [`MAX_URLS`].
pub fn build_entries(base_url: &str, items: &[SourcedItem], settings: &AdminSettings) -> Vec<SitemapEntry> {
    let now = Utc::now();
    let mut entries = static_entries(base_url, now);
    entries.extend(items.iter().map(|i| news_entry(base_url, i, settings, now)));
    entries.truncate(MAX_URLS);
    entries
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"\n\
         \x20       xmlns:news=\"http://www.google.com/schemas/sitemap-news/0.9\"\n\
         \x20       xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\">\n",
    );

    for e in entries {
        // Writing to a String cannot fail.
        let _ = writeln!(xml, "  <url>");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&e.loc));
        let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape_xml(&e.lastmod));
        let _ = writeln!(xml, "    <changefreq>{}</changefreq>", escape_xml(&e.changefreq));
        let _ = writeln!(xml, "    <priority>{}</priority>", escape_xml(&e.priority));
        if let Some(news) = &e.news {
            let _ = writeln!(
                xml,
                "    <news:news>\n      <news:publication>\n        <news:name>{PUBLICATION_NAME}</news:name>\n        <news:language>es</news:language>\n      </news:publication>\n      <news:publication_date>{}</news:publication_date>\n      <news:title>{}</news:title>\n    </news:news>",
                escape_xml(&news.publication_date),
                escape_xml(&news.title)
            );
        }
        if let Some(image) = &e.image {
            let title = e.news.as_ref().map(|n| n.title.as_str()).unwrap_or("Noticia");
            let _ = writeln!(
                xml,
                "    <image:image>\n      <image:loc>{}</image:loc>\n      <image:title>{}</image:title>\n    </image:image>",
                escape_xml(image),
                escape_xml(title)
            );
        }
        let _ = writeln!(xml, "  </url>");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("User-agent: *\nAllow: /\n\n# Sitemaps\nSitemap: {base}/sitemap.xml\n\n# Crawl-delay\nCrawl-delay: 1\n")
}

/// Write `sitemap.xml` and `robots.txt` into `output_dir`. Returns the sitemap path.
#[instrument(level = "info", skip(entries), fields(urls = entries.len()))]
pub async fn write_sitemap(output_dir: &str, base_url: &str, entries: &[SitemapEntry]) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(output_dir).await?;
    let path = Path::new(output_dir).join(SITEMAP_FILE);
    fs::write(&path, render_sitemap(entries)).await?;
    fs::write(Path::new(output_dir).join("robots.txt"), robots_txt(base_url)).await?;
    info!(path = %path.display(), "Wrote sitemap");
    Ok(path)
}
