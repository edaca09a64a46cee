//! # HGARUNA News
//!
//! A static news-site generator that aggregates RSS feeds from outlets such
//! as BBC, El País, Clarín and El Tiempo, relaying them through public CORS
//! proxies when needed, and renders the front page, sitemap and search index.
//!
//! ## Features
//!
//! - Fetches every configured feed, directly or through an ordered proxy list,
//!   with per-attempt timeouts and retry with backoff
//! - Degrades failed feeds to static per-category content
//! - Renders Bootstrap news cards with schema.org microdata and per-route SEO tags
//! - Writes a JSON snapshot, `sitemap.xml` (Google News and image extensions)
//!   and the generated-article list
//! - Per-category pages (Deportes, Tecnología, Cultura, Autos, Último)
//! - Trending keywords and a breaking-news ticker on the home page
//! - Keyword search over the last build and IndexNow submission
//!
//! ## Usage
//!
//! ```sh
//! hgaruna_news -o ./public build
//! hgaruna_news -o ./public search "copa america"
//! ```
//!
//! ## Architecture
//!
//! The `build` command follows a pipeline:
//! 1. **Fetching**: Raw XML per feed via [`fetcher`], cached in [`cache`]
//! 2. **Parsing**: RSS to items via [`parser`]
//! 3. **Aggregation**: Batched loads with fallback content via [`aggregator`]
//! 4. **Output**: One HTML page per [`seo::Route`], JSON snapshot and sitemap via [`outputs`]

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cache;
mod cli;
mod config;
mod error;
mod fallback;
mod fetcher;
mod indexnow;
mod models;
mod outputs;
mod parser;
mod search;
mod seo;
mod settings;
mod trends;
mod utils;

use aggregator::{Aggregator, featured};
use cache::FeedCache;
use cli::{ArticlesCommand, Cli, Command, IndexNowArgs, SettingsCommand};
use config::AppConfig;
use error::IndexNowError;
use fetcher::{ProxyFetcher, RetryFetch};
use indexnow::{IndexNowClient, Submission};
use models::Snapshot;
use outputs::articles::{self, ArticleEntry};
use outputs::{html, json, sitemap};
use seo::{Route, render_meta_tags};
use settings::SettingsStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("hgaruna_news starting up");

    let args = Cli::parse();
    debug!(?args.command, %args.output_dir, ?args.config, "Parsed CLI arguments");

    let config = AppConfig::load(args.config.as_deref()).await?;
    let store = SettingsStore::new(&args.settings);

    match &args.command {
        Command::Build { route, feeds } => run_build(&args, &config, &store, route.as_deref(), feeds).await?,
        Command::Search { query, html } => run_search(&args, &config, &query.join(" "), *html).await?,
        Command::Sitemap => run_sitemap(&args, &config, &store).await?,
        Command::Trending { limit } => run_trending(&args, *limit).await?,
        Command::Breaking => run_breaking(&args).await?,
        Command::Meta { path } => {
            let route = Route::detect(path);
            println!("{}", render_meta_tags(&route.meta(), &canonical_url(&config, route)));
        }
        Command::Settings(cmd) => run_settings(&store, cmd).await?,
        Command::Articles(cmd) => run_articles(&args, cmd).await?,
        Command::Indexnow(indexnow_args) => run_indexnow(&args, &config, &store, indexnow_args).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn canonical_url(config: &AppConfig, route: Route) -> String {
    format!("{}{}", config.base_url.trim_end_matches('/'), route.path())
}

fn build_fetcher(config: &AppConfig) -> Result<RetryFetch<ProxyFetcher>, Box<dyn Error>> {
    Ok(RetryFetch::new(
        ProxyFetcher::new(config)?,
        config.retry.max_retries,
        config.retry.base_delay(),
        config.retry.max_delay(),
    ))
}

#[instrument(level = "info", skip_all, fields(output_dir = %args.output_dir, ?route))]
async fn run_build(
    args: &Cli,
    config: &AppConfig,
    store: &SettingsStore,
    route: Option<&str>,
    feed_ids: &[String],
) -> Result<(), Box<dyn Error>> {
    let routes: Vec<Route> = match route {
        Some(path) => vec![Route::detect(path)],
        None => Route::ALL.to_vec(),
    };
    let sources: Vec<_> = config
        .select_feeds(feed_ids)?
        .into_iter()
        .filter(|s| routes.iter().any(|r| r.includes(&s.id)))
        .collect();

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let settings = store.load().await;
    let cache = Arc::new(FeedCache::new(&config.cache));
    let aggregator = Aggregator::new(build_fetcher(config)?, cache, config);

    // ---- Load feeds ----
    let outcomes = aggregator.load_all(&sources).await;
    let snapshot = Snapshot::from_outcomes(&outcomes);
    let live = snapshot.live_items();

    // ---- Pages ----
    for route in routes {
        let page_outcomes: Vec<_> = outcomes
            .iter()
            .filter(|o| route.includes(&o.source().id))
            .cloned()
            .collect();
        if page_outcomes.is_empty() {
            warn!(%route, "No feeds selected for this page; it will only carry the featured row");
        }

        let top = featured(&page_outcomes, config.page_size);
        let lead = if route == Route::Home {
            let titles = live.iter().map(|s| s.item.title.as_str());
            let keywords = trends::trending_keywords(titles, trends::TRENDING_LIMIT);
            let breaking = trends::breaking_news(&live);
            debug!(keywords = keywords.len(), breaking = breaking.len(), "Computed home page lead");
            format!("{}{}", html::render_breaking(&breaking), html::render_trending(&keywords))
        } else {
            String::new()
        };

        let head = render_meta_tags(&route.meta(), &canonical_url(config, route));
        let page = html::render_page(&page_outcomes, &top, &head, &lead, config.page_size, &config.default_images);
        let page_path = Path::new(&args.output_dir).join(route.file_name());
        tokio::fs::write(&page_path, page).await?;
        info!(
            %route,
            feeds = page_outcomes.len(),
            featured = top.len(),
            path = %page_path.display(),
            edition = %Local::now().format("%Y-%m-%d %H:%M"),
            "Wrote page"
        );
    }

    // ---- Snapshot ----
    if let Err(e) = json::write_snapshot(&snapshot, &args.output_dir).await {
        error!(error = %e, "Failed to write feed snapshot");
    }

    // ---- Sitemap ----
    let entries = sitemap::build_entries(&config.base_url, &live, &settings);
    if let Err(e) = sitemap::write_sitemap(&args.output_dir, &config.base_url, &entries).await {
        error!(error = %e, "Failed to write sitemap");
    }

    Ok(())
}

async fn read_live_items(args: &Cli) -> Result<Vec<models::SourcedItem>, Box<dyn Error>> {
    let snapshot = json::read_snapshot(&json::snapshot_path(&args.output_dir))
        .await
        .ok_or("no feed snapshot found (run `build` first)")?;
    Ok(snapshot.live_items())
}

async fn run_trending(args: &Cli, limit: usize) -> Result<(), Box<dyn Error>> {
    let items = read_live_items(args).await?;
    let keywords = trends::trending_keywords(items.iter().map(|s| s.item.title.as_str()), limit);
    info!(items = items.len(), keywords = keywords.len(), "Trending keywords");
    for k in &keywords {
        match k.category() {
            Some(category) => println!("{:>4}  {}  ({category})", k.count, k.word),
            None => println!("{:>4}  {}", k.count, k.word),
        }
    }
    Ok(())
}

async fn run_breaking(args: &Cli) -> Result<(), Box<dyn Error>> {
    let items = read_live_items(args).await?;
    for s in trends::breaking_news(&items) {
        println!(
            "[{}] {}  {}",
            s.fuente.as_deref().unwrap_or(&s.feed_title),
            s.item.title,
            s.item.link
        );
    }
    Ok(())
}

#[instrument(level = "info", skip(args, config))]
async fn run_search(args: &Cli, config: &AppConfig, query: &str, as_html: bool) -> Result<(), Box<dyn Error>> {
    let snapshot = json::read_snapshot(&json::snapshot_path(&args.output_dir)).await;
    let article_list = articles::read_articles(&args.articles_path()).await;
    let fetcher = build_fetcher(config)?;

    let corpus = search::collect_corpus(snapshot.as_ref(), &article_list, &fetcher).await;
    let results = search::search_items(&corpus, query);
    info!(corpus = corpus.len(), results = results.len(), "Search finished");

    if as_html {
        println!("{}", search::render_results_html(&results, query));
    } else {
        print!("{}", search::render_results_text(&results, query));
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_sitemap(args: &Cli, config: &AppConfig, store: &SettingsStore) -> Result<(), Box<dyn Error>> {
    let items = match json::read_snapshot(&json::snapshot_path(&args.output_dir)).await {
        Some(snapshot) => snapshot.live_items(),
        None => {
            warn!("No feed snapshot found; the sitemap will only list static pages (run `build` first)");
            Vec::new()
        }
    };
    let settings = store.load().await;
    let entries = sitemap::build_entries(&config.base_url, &items, &settings);
    let path = sitemap::write_sitemap(&args.output_dir, &config.base_url, &entries).await?;
    println!("{} ({} URLs)", path.display(), entries.len());
    Ok(())
}

async fn run_settings(store: &SettingsStore, cmd: &SettingsCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        SettingsCommand::Show => {
            let settings = store.load().await;
            println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        }
        SettingsCommand::Set { key, value } => {
            let settings = store.set(key, value).await?;
            println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
        }
        SettingsCommand::Reset => {
            store.reset().await?;
            println!("Settings reset to defaults ({})", store.path().display());
        }
    }
    Ok(())
}

async fn run_articles(args: &Cli, cmd: &ArticlesCommand) -> Result<(), Box<dyn Error>> {
    let path = args.articles_path();
    match cmd {
        ArticlesCommand::Add(add) => {
            let entry = ArticleEntry::new(
                &add.file_name,
                &add.title,
                &add.url,
                add.description.as_deref(),
                add.image_url.as_deref(),
            )?;
            let list = articles::add_article(&path, entry).await?;
            println!("{} ({} articles)", path.display(), list.total_articles);
        }
        ArticlesCommand::List => {
            let list = articles::read_articles(&path).await;
            for a in &list.articles {
                println!("{}  {}  {}", a.date, a.file_name, a.title);
            }
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_indexnow(
    args: &Cli,
    config: &AppConfig,
    store: &SettingsStore,
    indexnow_args: &IndexNowArgs,
) -> Result<(), Box<dyn Error>> {
    let settings = store.load().await;
    let key = match indexnow::resolve_key(indexnow_args.key.as_deref(), &settings) {
        Ok(key) => key,
        Err(e @ IndexNowError::MissingKey) => {
            error!(error = %e, "Missing IndexNow key");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let host = match &indexnow_args.host {
        Some(host) => host.clone(),
        None => url::Url::parse(&config.base_url)?
            .host_str()
            .map(str::to_string)
            .ok_or("base_url has no host")?,
    };

    let sitemaps = if indexnow_args.sitemaps.is_empty() {
        vec![Path::new(&args.output_dir).join(sitemap::SITEMAP_FILE)]
    } else {
        indexnow_args.sitemaps.clone()
    };

    let urls = indexnow::collect_urls(&sitemaps).await;
    let client = IndexNowClient::new(indexnow_args.endpoint.clone());
    let sent = client.submit(&Submission::new(&host, &key, urls)).await?;
    info!(sent, %host, "IndexNow done");
    Ok(())
}
