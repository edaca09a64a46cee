//! IndexNow submission of sitemap URLs.
//!
//! Every `<loc>` of the given sitemaps is collected (duplicates dropped,
//! first occurrence kept) and POSTed in one request:
//!
//! ```json
//! { "host": "...", "key": "...", "keyLocation": "https://{host}/{key}.txt", "urlList": [...] }
//! ```

use crate::error::IndexNowError;
use crate::settings::AdminSettings;
use crate::utils::{truncate_for_log, unescape_entities};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const INDEXNOW_ENDPOINT: &str = "https://api.indexnow.org/indexnow";

static LOC: Lazy<Regex> = Lazy::new(|| Regex::new(r"<loc>([^<]+)</loc>").expect("valid regex"));

/// `<loc>` values of a sitemap, unescaped, in document order.
pub fn extract_locs(xml: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .map(|c| unescape_entities(c[1].trim()).into_owned())
        .collect()
}

/// URLs of every readable sitemap in `paths`, de-duplicated in order.
///
/// Unreadable files are logged and skipped.
#[instrument(level = "info")]
pub async fn collect_urls(paths: &[PathBuf]) -> Vec<String> {
    let mut urls = Vec::new();
    for path in paths {
        match fs::read_to_string(path).await {
            Ok(xml) => urls.extend(extract_locs(&xml)),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not read sitemap"),
        }
    }
    urls.into_iter().unique().collect()
}

/// The key from the command line (or `INDEXNOW_KEY`), else from settings.
pub fn resolve_key(explicit: Option<&str>, settings: &AdminSettings) -> Result<String, IndexNowError> {
    explicit
        .or(settings.indexnow_key.as_deref())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or(IndexNowError::MissingKey)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub host: String,
    pub key: String,
    pub key_location: String,
    pub url_list: Vec<String>,
}

impl Submission {
    pub fn new(host: &str, key: &str, urls: Vec<String>) -> Self {
        Submission {
            host: host.to_string(),
            key: key.to_string(),
            key_location: format!("https://{host}/{key}.txt"),
            url_list: urls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexNowClient {
    client: Client,
    endpoint: String,
}

impl IndexNowClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// POST `submission`. Returns the number of URLs sent.
    ///
    /// An empty URL list is logged and not sent.
    #[instrument(level = "info", skip_all, fields(host = %submission.host, urls = submission.url_list.len()))]
    pub async fn submit(&self, submission: &Submission) -> Result<usize, IndexNowError> {
        if submission.url_list.is_empty() {
            info!("No URLs to submit");
            return Ok(0);
        }

        let resp = self.client.post(&self.endpoint).json(submission).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&body, 300), "IndexNow rejected submission");
            return Err(IndexNowError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(%status, "Submitted URLs to IndexNow");
        Ok(submission.url_list.len())
    }
}
