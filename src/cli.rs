//! Command-line interface definitions for HGARUNA News.
//!
//! Global options select the configuration file and where generated files
//! live; each subcommand runs one part of the site pipeline.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the HGARUNA News generator.
///
/// # Examples
///
/// ```sh
/// # Fetch every feed and write every page, feeds.json, sitemap.xml
/// hgaruna_news -o ./public build
///
/// # Only the Deportes page
/// hgaruna_news -o ./public build --route /deportes.html
///
/// # Search the last build
/// hgaruna_news -o ./public search "inteligencia artificial"
///
/// # Submit the sitemap to IndexNow
/// INDEXNOW_KEY=... hgaruna_news -o ./public indexnow
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file (feeds, proxies, timeouts)
    #[arg(short, long, global = true, env = "HGARUNA_CONFIG")]
    pub config: Option<String>,

    /// Directory for generated files
    #[arg(short, long, global = true, default_value = "public")]
    pub output_dir: String,

    /// Admin settings file
    #[arg(short, long, global = true, default_value = crate::settings::DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Article list file [default: <output-dir>/articulos-list.json]
    #[arg(long, global = true)]
    pub articles: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch every feed and write the site pages, snapshot and sitemap
    Build {
        /// Only render the page for this site path [default: every page]
        #[arg(long)]
        route: Option<String>,

        /// Only load these feed ids (repeatable) [default: every configured feed]
        #[arg(long = "feed")]
        feeds: Vec<String>,
    },

    /// Search the items of the last build and the article list
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print results as HTML instead of text
        #[arg(long)]
        html: bool,
    },

    /// Regenerate sitemap.xml and robots.txt from the last build
    Sitemap,

    /// Print the most frequent title keywords of the last build
    Trending {
        #[arg(long, default_value_t = crate::trends::TRENDING_LIMIT)]
        limit: usize,
    },

    /// Print the breaking-news ticker of the last build
    Breaking,

    /// Print the SEO head tags for a site path
    Meta {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Show or change admin settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage the generated-article list
    #[command(subcommand)]
    Articles(ArticlesCommand),

    /// Submit sitemap URLs to IndexNow
    Indexnow(IndexNowArgs),
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SettingsCommand {
    /// Print the current settings (credentials masked)
    Show,
    /// Set one setting, e.g. `sitemapPriority 0.8`
    Set { key: String, value: String },
    /// Delete the settings file, restoring defaults
    Reset,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ArticlesCommand {
    /// Add or replace an article entry
    Add(AddArticleArgs),
    /// List article entries
    List,
}

#[derive(Args, Debug, PartialEq)]
pub struct AddArticleArgs {
    #[arg(long)]
    pub file_name: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub image_url: Option<String>,
}

#[derive(Args, Debug, PartialEq)]
pub struct IndexNowArgs {
    /// IndexNow key; falls back to the `indexnowKey` setting
    #[arg(long, env = "INDEXNOW_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Sitemap files to read [default: <output-dir>/sitemap.xml]
    #[arg(long = "sitemap")]
    pub sitemaps: Vec<PathBuf>,

    /// Host to submit for [default: host of the configured base URL]
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, default_value = crate::indexnow::INDEXNOW_ENDPOINT)]
    pub endpoint: String,
}

impl Cli {
    pub fn articles_path(&self) -> PathBuf {
        self.articles
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.output_dir).join(crate::outputs::articles::ARTICLES_FILE))
    }
}
