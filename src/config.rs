//! Runtime configuration: feed table, CORS proxies, timeouts, retry and cache.
//!
//! Configuration is read from a YAML file when one is given; every field has a
//! serde default so a partial file only overrides what it names. Without a
//! file, [`AppConfig::default`] reproduces the site's built-in feed table.
//!
//! ```yaml
//! proxies:
//!   - "https://api.allorigins.win/get?url="
//! request_timeout_ms: 15000
//! page_size: 6
//! feeds:
//!   - id: bbc-world
//!     title: BBC World News
//!     url: https://feeds.bbci.co.uk/news/world/rss.xml
//!     containerId: bbc-mundo-container
//!     fuente: BBC
//!     categoria: Internacional
//! ```

use crate::models::FeedSource;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Retry schedule applied to a whole fetch (direct + every proxy).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Soft cache for parsed feeds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: 5 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedSource>,
    /// CORS proxy prefixes, tried in order. The percent-encoded feed URL is appended.
    pub proxies: Vec<String>,
    /// Hosts (suffix match) that are fetched directly before falling back to proxies.
    pub direct_hosts: Vec<String>,
    /// Card images used when an item carries none.
    pub default_images: Vec<String>,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    /// Maximum items kept per parsed feed.
    pub max_items: usize,
    /// Maximum cards rendered per section.
    pub page_size: usize,
    /// Feeds loaded concurrently per batch.
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Public origin of the site, used for canonical and sitemap URLs.
    pub base_url: String,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            feeds: default_feeds(),
            proxies: vec![
                "https://api.allorigins.win/get?url=".to_string(),
                "https://thingproxy.freeboard.io/fetch/".to_string(),
                "https://corsproxy.io/?".to_string(),
                "https://api.codetabs.com/v1/proxy?quest=".to_string(),
            ],
            direct_hosts: vec!["bbci.co.uk".to_string()],
            default_images: vec![
                "https://images.unsplash.com/photo-1586953208448-b95a79798f07?w=800&h=600&fit=crop".to_string(),
                "https://images.unsplash.com/photo-1504711434969-e33886168f5c?w=800&h=600&fit=crop".to_string(),
                "https://images.unsplash.com/photo-1495020683877-95802f6f647a?w=800&h=600&fit=crop".to_string(),
            ],
            request_timeout_ms: 10_000,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            max_items: 20,
            page_size: 6,
            batch_size: 3,
            batch_delay_ms: 1000,
            base_url: "https://news.hgaruna.org".to_string(),
            user_agent: "Mozilla/5.0 (compatible; RSSReader/1.0)".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, or the built-in defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using built-in feed table");
            return Ok(AppConfig::default());
        };
        let raw = tokio::fs::read_to_string(Path::new(path)).await?;
        let config = Self::from_yaml(&raw)?;
        info!(path, feeds = config.feeds.len(), proxies = config.proxies.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn feed(&self, id: &str) -> Option<&FeedSource> {
        self.feeds.iter().find(|f| f.id == id)
    }

    /// The feeds named by `ids`, in the given order; every feed when empty.
    pub fn select_feeds(&self, ids: &[String]) -> Result<Vec<FeedSource>, String> {
        if ids.is_empty() {
            return Ok(self.feeds.clone());
        }
        ids.iter()
            .map(|id| self.feed(id).cloned().ok_or_else(|| format!("unknown feed id `{id}`")))
            .collect()
    }
}

/// Whether the host of `url` equals one of `hosts` or is a subdomain of one.
pub fn host_allowed(url: &str, hosts: &[String]) -> bool {
    let Some(host) = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    else {
        return false;
    };
    hosts
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

fn feed(id: &str, title: &str, url: &str, container_id: &str, fuente: &str, categoria: &str) -> FeedSource {
    FeedSource {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        container_id: container_id.to_string(),
        fuente: fuente.to_string(),
        categoria: categoria.to_string(),
    }
}

/// The site's feed table.
pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        feed("bbc-world", "BBC World News", "https://feeds.bbci.co.uk/news/world/rss.xml", "bbc-mundo-container", "BBC", "Internacional"),
        feed("bbc-tech", "BBC Technology", "https://feeds.bbci.co.uk/news/technology/rss.xml", "bbc-tech-container", "BBC", "Tecnología"),
        feed("bbc-sport", "BBC Sport", "https://feeds.bbci.co.uk/sport/rss.xml", "bbc-sport-container", "BBC", "Deportes"),
        feed("elpais-portada", "El País Portada", "https://elpais.com/rss/elpais/portada.xml", "elpais-portada-container", "El País", "España"),
        feed("elpais-internacional", "El País Internacional", "https://elpais.com/rss/internacional/portada.xml", "elpais-internacional-container", "El País", "Internacional"),
        feed("elpais-populares", "El País Lo Más Visto", "https://elpais.com/rss/tags/noticias_mas_vistas.xml", "elpais-populares-container", "El País", "Destacadas"),
        feed("clarin-politica", "Clarín Política", "https://www.clarin.com/rss/politica/", "categoria5-news-container", "Clarín", "Política"),
        feed("clarin-internacional", "Clarín Internacional", "https://www.clarin.com/rss/mundo/", "categoria7-news-container", "Clarín", "Internacional"),
        feed("clarin-tecnologia", "Clarín Tecnología", "https://www.clarin.com/rss/tecnologia/", "tecnologia-news-container", "Clarín", "Tecnología"),
        feed("clarin-cultura", "Clarín Cultura", "https://www.clarin.com/rss/cultura/", "categoria6-news-container", "Clarín", "Cultura"),
        feed("clarin-autos", "Clarín Autos", "https://www.clarin.com/rss/autos/", "categoria8-news-container", "Clarín", "Autos"),
        feed("clarin-deportes", "Clarín Deportes", "https://www.clarin.com/rss/deportes/", "categoria3-news-container", "Clarín", "Deportes"),
        feed("clarin-espectaculos", "Clarín Espectáculos", "https://www.clarin.com/rss/espectaculos/", "categoria1-news-container", "Clarín", "Espectáculos"),
        feed("clarin-cine", "Clarín Cine", "https://www.clarin.com/rss/espectaculos/cine/", "categoria2-news-container", "Clarín", "Cine"),
        feed("clarin-viajes", "Clarín Viajes", "https://www.clarin.com/rss/viajes/", "categoria9-news-container", "Clarín", "Viajes"),
        feed("lanacion-general", "La Nación Colombia", "https://lanacion.com.co/feed", "lanacion-container", "La Nación", "Colombia"),
        feed("eltiempo-colombia", "El Tiempo Colombia", "https://www.eltiempo.com/rss/colombia.xml", "eltiempo-container", "El Tiempo", "Colombia"),
        feed("eltiempo-bogota", "El Tiempo Bogotá", "https://www.eltiempo.com/rss/bogota.xml", "eltiempo-bogota-container", "El Tiempo", "Bogotá"),
        feed("eltiempo-mundo", "El Tiempo Mundo", "https://www.eltiempo.com/rss/mundo.xml", "eltiempo-mundo-container", "El Tiempo", "Internacional"),
        feed("eltiempo-tecnosfera", "El Tiempo Tecnósfera", "https://www.eltiempo.com/rss/tecnosfera.xml", "eltiempo-tecnosfera-container", "El Tiempo", "Tecnología"),
        feed("eltiempo-economia", "El Tiempo Economía", "https://www.eltiempo.com/rss/economia.xml", "eltiempo-economia-container", "El Tiempo", "Economía"),
        feed("eltiempo-cultura", "El Tiempo Cultura", "https://www.eltiempo.com/rss/cultura.xml", "eltiempo-cultura-container", "El Tiempo", "Cultura"),
    ]
}
