//! `articulos-list.json`: the index of generated articles.

use crate::error::ArticleError;
use crate::models::{NewsItem, SourcedItem};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const ARTICLES_FILE: &str = "articulos-list.json";
pub const DEFAULT_DESCRIPTION: &str = "Artículo analizado y procesado por inteligencia artificial.";
pub const DEFAULT_IMAGE: &str = "https://placehold.co/800x450/667eea/ffffff?text=Artículo+IA";
const DEFAULT_TITLE: &str = "Artículo IA";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleEntry {
    pub file_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub url: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(rename = "isAI", default)]
    pub is_ai: bool,
}

impl ArticleEntry {
    /// New AI article dated today. Empty description and image get defaults.
    pub fn new(
        file_name: &str,
        title: &str,
        url: &str,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Self, ArticleError> {
        let required = |value: &str, field| {
            let value = value.trim();
            if value.is_empty() {
                Err(ArticleError::MissingField(field))
            } else {
                Ok(value.to_string())
            }
        };
        Ok(ArticleEntry {
            file_name: required(file_name, "fileName")?,
            title: required(title, "title")?,
            url: required(url, "url")?,
            description: or_default(description, DEFAULT_DESCRIPTION),
            image_url: or_default(image_url, DEFAULT_IMAGE),
            date: Utc::now().format("%Y-%m-%d").to_string(),
            is_ai: true,
        })
    }

    /// The entry as a searchable news item.
    pub fn to_sourced_item(&self) -> SourcedItem {
        let title = if self.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            self.title.clone()
        };
        SourcedItem {
            item: NewsItem {
                title,
                description: self.description.clone(),
                link: self.url.clone(),
                pub_date: self.date.clone(),
                image_url: (!self.image_url.is_empty()).then(|| self.image_url.clone()),
            },
            feed_title: "Artículos IA".to_string(),
            categoria: None,
            fuente: None,
        }
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleList {
    #[serde(default)]
    pub articles: Vec<ArticleEntry>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_articles: usize,
}

impl ArticleList {
    /// Insert or replace (by `file_name`) and keep newest dates first.
    pub fn upsert(&mut self, entry: ArticleEntry) {
        match self.articles.iter_mut().find(|a| a.file_name == entry.file_name) {
            Some(existing) => *existing = entry,
            None => self.articles.insert(0, entry),
        }
        // Dates are ISO, so string order is date order; the sort is stable.
        self.articles.sort_by(|a, b| b.date.cmp(&a.date));
        self.last_updated = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.total_articles = self.articles.len();
    }
}

/// Read the list at `path`. Missing or corrupt files read as empty.
#[instrument(level = "debug")]
pub async fn read_articles(path: &Path) -> ArticleList {
    match fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Article list is corrupt; starting a new one");
            ArticleList::default()
        }),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Could not read article list");
            }
            ArticleList::default()
        }
    }
}

/// Add `entry` to the list at `path` and write it back.
#[instrument(level = "info", skip(entry), fields(file_name = %entry.file_name))]
pub async fn add_article(path: &Path, entry: ArticleEntry) -> Result<ArticleList, ArticleError> {
    let mut list = read_articles(path).await;
    let title = entry.title.clone();
    list.upsert(entry);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, serde_json::to_string_pretty(&list)?).await?;
    info!(%title, total = list.total_articles, "Updated article list");
    Ok(list)
}
