//! Typed errors for the feed pipeline and the sibling commands.

use thiserror::Error;

/// A single failed attempt while fetching a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// `"direct"` or the proxy prefix that was tried.
    pub via: String,
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.via, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty body from {url}")]
    EmptyBody { url: String },

    #[error("unrecognized proxy response format from {url}")]
    Envelope { url: String },

    #[error("response from {url} is not an RSS feed")]
    NotAFeed { url: String },

    #[error("every fetch attempt failed ({})", format_attempts(.attempts))]
    AllProxiesFailed { attempts: Vec<AttemptFailure> },
}

fn format_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no RSS <channel> element found")]
    NoChannel,

    #[error("document ends inside <{0}>")]
    Truncated(String),
}

/// Loading a feed end to end: fetch, then parse.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),

    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },

    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article is missing `{0}`")]
    MissingField(&'static str),

    #[error("article list I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("article list serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum IndexNowError {
    #[error("no IndexNow key configured (use --key, INDEXNOW_KEY or `settings set indexnow_key`)")]
    MissingKey,

    #[error("IndexNow rejected the submission: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("IndexNow request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_proxies_failed_lists_attempts() {
        let err = FetchError::AllProxiesFailed {
            attempts: vec![
                AttemptFailure {
                    via: "direct".to_string(),
                    reason: "HTTP 503".to_string(),
                },
                AttemptFailure {
                    via: "https://corsproxy.io/?".to_string(),
                    reason: "timed out".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("direct: HTTP 503"));
        assert!(msg.contains("https://corsproxy.io/?: timed out"));
    }

    #[test]
    fn test_feed_error_is_transparent() {
        let err: FeedError = ParseError::NoChannel.into();
        assert_eq!(err.to_string(), "no RSS <channel> element found");
    }
}
