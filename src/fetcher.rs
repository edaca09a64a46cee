//! Feed fetching through CORS-proxy fallback, with retry and backoff.
//!
//! Many outlets refuse cross-origin requests, so the site relays their feeds
//! through public CORS proxies. This module keeps that behaviour in one
//! parameterized place.
//!
//! # Architecture
//!
//! - [`FetchXml`]: Core trait, "give me the raw XML behind this URL"
//! - [`ProxyFetcher`]: Direct fetch for whitelisted hosts, then every proxy in order
//! - [`RetryFetch`]: Decorator that re-runs any [`FetchXml`] with capped backoff
//!
//! # Bounded failure
//!
//! Every attempt runs under its own timeout, so one [`ProxyFetcher::fetch_xml`]
//! call takes at most `timeout × (proxies + 1)` before it reports
//! [`FetchError::AllProxiesFailed`].
//!
//! # Proxy envelopes
//!
//! Some proxies wrap the upstream body in JSON (`{"contents": "..."}` for
//! allorigins, `{"data": "..."}` for others), some return it raw. See
//! [`unwrap_envelope`].
//!
//! A body only ends the chain when it looks like RSS (see [`looks_like_feed`]).
//! Rate-limit and challenge pages come back as 200 HTML, and the next proxy
//! may still have the feed.

use crate::config::{AppConfig, host_allowed};
use crate::error::{AttemptFailure, FetchError};
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

const ACCEPT_XML: &str = "application/xml, text/xml, */*";

/// Trait for fetching the raw XML text of a feed.
pub trait FetchXml {
    /// Fetch `url` and return its body as text.
    async fn fetch_xml(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches feeds directly or through an ordered list of CORS proxies.
#[derive(Clone)]
pub struct ProxyFetcher {
    client: Client,
    proxies: Vec<String>,
    direct_hosts: Vec<String>,
    timeout: Duration,
}

impl fmt::Debug for ProxyFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFetcher")
            .field("proxies", &self.proxies)
            .field("direct_hosts", &self.direct_hosts)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProxyFetcher {
    /// Build a fetcher from the proxy list, direct-host whitelist and timeout in `config`.
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;
        Ok(Self {
            client,
            proxies: config.proxies.clone(),
            direct_hosts: config.direct_hosts.clone(),
            timeout: config.request_timeout(),
        })
    }

    /// One GET bounded by the per-attempt timeout; non-2xx and empty bodies are failures.
    async fn get_text(&self, request_url: &str) -> Result<String, FetchError> {
        let request = async {
            let response = self
                .client
                .get(request_url)
                .header(ACCEPT, ACCEPT_XML)
                .send()
                .await
                .map_err(|source| FetchError::Http {
                    url: request_url.to_string(),
                    source,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: request_url.to_string(),
                    status: status.as_u16(),
                });
            }
            response.text().await.map_err(|source| FetchError::Http {
                url: request_url.to_string(),
                source,
            })
        };

        let body = timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout {
                url: request_url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: request_url.to_string(),
            });
        }
        Ok(body)
    }

    async fn via_proxy(&self, proxy: &str, url: &str) -> Result<String, FetchError> {
        let proxy_url = format!("{proxy}{}", urlencoding::encode(url));
        let body = self.get_text(&proxy_url).await?;
        let xml = unwrap_envelope(&proxy_url, body)?;
        if xml.trim().is_empty() {
            return Err(FetchError::EmptyBody { url: proxy_url });
        }
        ensure_feed(&proxy_url, xml)
    }

    async fn direct(&self, url: &str) -> Result<String, FetchError> {
        let body = self.get_text(url).await?;
        ensure_feed(url, body)
    }
}

impl FetchXml for ProxyFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch_xml(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let mut attempts = Vec::new();

        if host_allowed(url, &self.direct_hosts) {
            match self.direct(url).await {
                Ok(body) => {
                    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Direct fetch succeeded");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(error = %e, "Direct fetch failed; falling back to proxies");
                    attempts.push(AttemptFailure {
                        via: "direct".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for (index, proxy) in self.proxies.iter().enumerate() {
            match self.via_proxy(proxy, url).await {
                Ok(xml) => {
                    info!(
                        proxy = %proxy,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Proxy fetch succeeded"
                    );
                    return Ok(xml);
                }
                Err(e) => {
                    warn!(
                        proxy = %proxy,
                        attempt = index + 1,
                        of = self.proxies.len(),
                        error = %e,
                        "Proxy failed; trying next"
                    );
                    attempts.push(AttemptFailure {
                        via: proxy.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        error!(
            attempts = attempts.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Every fetch attempt failed"
        );
        Err(FetchError::AllProxiesFailed { attempts })
    }
}

/// Whether `xml` carries an RSS root or channel element.
pub fn looks_like_feed(xml: &str) -> bool {
    xml.contains("<rss") || xml.contains("<channel")
}

fn ensure_feed(url: &str, body: String) -> Result<String, FetchError> {
    if looks_like_feed(&body) {
        Ok(body)
    } else {
        debug!(url, body = %crate::utils::truncate_for_log(&body, 120), "Body is not a feed");
        Err(FetchError::NotAFeed { url: url.to_string() })
    }
}

/// Extract the upstream body from a proxy response.
///
/// - JSON object with a string `contents` → that string
/// - else JSON object with a string `data` → that string
/// - JSON string → the string
/// - JSON object with neither → [`FetchError::Envelope`]
/// - anything that is not JSON → the body unchanged
pub fn unwrap_envelope(url: &str, body: String) -> Result<String, FetchError> {
    let trimmed = body.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('"')) {
        return Ok(body);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["contents", "data"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| FetchError::Envelope { url: url.to_string() }),
        Ok(Value::String(s)) => Ok(s),
        Ok(_) => Err(FetchError::Envelope { url: url.to_string() }),
        Err(_) => Ok(body),
    }
}

/// Wrapper that re-runs any [`FetchXml`] implementation with capped exponential backoff.
///
/// `max_attempts` counts every try, the first included. The delay before
/// attempt `n + 1` is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchXml,
{
    pub fn new(inner: T, max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after `attempt` failed attempts, without jitter.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchXml for RetryFetch<T>
where
    T: FetchXml,
{
    #[instrument(level = "info", skip(self))]
    async fn fetch_xml(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            debug!(attempt, max = self.max_attempts, "Fetching feed");
            match self.inner.fetch_xml(url).await {
                Ok(xml) => return Ok(xml),
                Err(e) => {
                    if attempt >= self.max_attempts {
                        error!(
                            attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch_xml() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "fetch_xml() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RSS: &str = "<rss><channel><title>t</title></channel></rss>";

    fn fetcher(proxies: Vec<String>, direct_hosts: Vec<String>, timeout_ms: u64) -> ProxyFetcher {
        let config = AppConfig {
            proxies,
            direct_hosts,
            request_timeout_ms: timeout_ms,
            ..AppConfig::default()
        };
        ProxyFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_unwrap_envelope_contents() {
        let body = r#"{"contents": "<rss/>", "status": {"http_code": 200}}"#.to_string();
        assert_eq!(unwrap_envelope("u", body).unwrap(), "<rss/>");
    }

    #[test]
    fn test_unwrap_envelope_data() {
        let body = r#"{"contents": null, "data": "<rss/>"}"#.to_string();
        assert_eq!(unwrap_envelope("u", body).unwrap(), "<rss/>");
    }

    #[test]
    fn test_unwrap_envelope_json_string() {
        assert_eq!(unwrap_envelope("u", r#""<rss/>""#.to_string()).unwrap(), "<rss/>");
    }

    #[test]
    fn test_unwrap_envelope_raw_xml() {
        assert_eq!(unwrap_envelope("u", RSS.to_string()).unwrap(), RSS);
    }

    #[test]
    fn test_unwrap_envelope_unknown_object() {
        let err = unwrap_envelope("u", r#"{"error": "blocked"}"#.to_string()).unwrap_err();
        assert!(matches!(err, FetchError::Envelope { .. }));
    }

    #[tokio::test]
    async fn test_first_proxy_json_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/get/".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({ "contents": RSS }).to_string())
            .create_async()
            .await;

        let f = fetcher(vec![format!("{}/get/", server.url())], vec![], 2000);
        let xml = f.fetch_xml("https://www.clarin.com/rss/politica/").await.unwrap();
        assert_eq!(xml, RSS);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_falls_through_failing_proxies() {
        let mut server = mockito::Server::new_async().await;
        let bad = server
            .mock("GET", mockito::Matcher::Regex(r"^/bad/".to_string()))
            .with_status(503)
            .create_async()
            .await;
        let empty = server
            .mock("GET", mockito::Matcher::Regex(r"^/empty/".to_string()))
            .with_status(200)
            .with_body("   ")
            .create_async()
            .await;
        let good = server
            .mock("GET", mockito::Matcher::Regex(r"^/good/".to_string()))
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;

        let base = server.url();
        let f = fetcher(
            vec![format!("{base}/bad/"), format!("{base}/empty/"), format!("{base}/good/")],
            vec![],
            2000,
        );
        let xml = f.fetch_xml("https://elpais.com/rss/elpais/portada.xml").await.unwrap();
        assert_eq!(xml, RSS);
        bad.assert_async().await;
        empty.assert_async().await;
        good.assert_async().await;
    }

    #[test]
    fn test_looks_like_feed() {
        assert!(looks_like_feed(RSS));
        assert!(looks_like_feed("<?xml version=\"1.0\"?>\n<rss version=\"2.0\">"));
        assert!(!looks_like_feed("<!DOCTYPE html><html><body>Rate limited</body></html>"));
        assert!(!looks_like_feed("Too Many Requests"));
    }

    #[tokio::test]
    async fn test_html_page_from_proxy_tries_next() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", mockito::Matcher::Regex(r"^/get/".to_string()))
            .with_status(200)
            .with_body(
                serde_json::json!({ "contents": "<!DOCTYPE html><html><body>Rate limited</body></html>" })
                    .to_string(),
            )
            .create_async()
            .await;
        let good = server
            .mock("GET", mockito::Matcher::Regex(r"^/fetch/".to_string()))
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;

        let base = server.url();
        let f = fetcher(vec![format!("{base}/get/"), format!("{base}/fetch/")], vec![], 2000);
        let xml = f.fetch_xml("https://www.clarin.com/rss/deportes/").await.unwrap();
        assert_eq!(xml, RSS);
        limited.assert_async().await;
        good.assert_async().await;
    }

    #[tokio::test]
    async fn test_html_only_responses_are_failures() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html><body>Just a moment...</body></html>")
            .create_async()
            .await;

        let f = fetcher(vec![format!("{}/p/", server.url())], vec![], 2000);
        match f.fetch_xml("https://www.clarin.com/rss/deportes/").await {
            Err(FetchError::AllProxiesFailed { attempts }) => {
                assert_eq!(attempts.len(), 1);
                assert!(attempts[0].reason.contains("not an RSS feed"));
            }
            other => panic!("expected AllProxiesFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_direct_fetch_falls_back_to_proxy() {
        let mut server = mockito::Server::new_async().await;
        let direct = server
            .mock("GET", "/news/world/rss.xml")
            .with_status(503)
            .create_async()
            .await;
        let proxy = server
            .mock("GET", mockito::Matcher::Regex(r"^/proxy/".to_string()))
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;

        let base = server.url();
        let f = fetcher(vec![format!("{base}/proxy/")], vec!["127.0.0.1".to_string()], 2000);
        let xml = f.fetch_xml(&format!("{base}/news/world/rss.xml")).await.unwrap();
        assert_eq!(xml, RSS);
        direct.assert_async().await;
        proxy.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_direct_fetch_is_recorded() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let base = server.url();
        let f = fetcher(vec![format!("{base}/proxy/")], vec!["127.0.0.1".to_string()], 2000);
        match f.fetch_xml(&format!("{base}/news/world/rss.xml")).await {
            Err(FetchError::AllProxiesFailed { attempts }) => {
                let via: Vec<_> = attempts.iter().map(|a| a.via.as_str()).collect();
                assert_eq!(via, vec!["direct".to_string(), format!("{base}/proxy/")]);
            }
            other => panic!("expected AllProxiesFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_feed_url_is_percent_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fetch/https%3A%2F%2Fwww.clarin.com%2Frss%2Fmundo%2F")
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;

        let f = fetcher(vec![format!("{}/fetch/", server.url())], vec![], 2000);
        f.fetch_xml("https://www.clarin.com/rss/mundo/").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_direct_fetch_for_whitelisted_host() {
        let mut server = mockito::Server::new_async().await;
        let direct = server
            .mock("GET", "/news/world/rss.xml")
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;

        // mockito listens on 127.0.0.1; whitelisting that host exercises the direct path.
        let f = fetcher(vec![], vec!["127.0.0.1".to_string()], 2000);
        let xml = f
            .fetch_xml(&format!("{}/news/world/rss.xml", server.url()))
            .await
            .unwrap();
        assert_eq!(xml, RSS);
        direct.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_proxies_fail_reports_every_attempt() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let base = server.url();
        let f = fetcher(
            vec![format!("{base}/a/"), format!("{base}/b/"), format!("{base}/c/")],
            vec![],
            2000,
        );
        match f.fetch_xml("https://www.clarin.com/rss/autos/").await {
            Err(FetchError::AllProxiesFailed { attempts }) => assert_eq!(attempts.len(), 3),
            other => panic!("expected AllProxiesFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hanging_proxies_are_bounded_by_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let proxies = (0..3).map(|i| format!("http://{addr}/p{i}/")).collect();
        let f = fetcher(proxies, vec![], 200);

        let t0 = Instant::now();
        let result = f.fetch_xml("https://www.clarin.com/rss/cultura/").await;
        let elapsed = t0.elapsed();

        match result {
            Err(FetchError::AllProxiesFailed { attempts }) => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts.iter().all(|a| a.reason.contains("timed out")));
            }
            other => panic!("expected AllProxiesFailed, got {other:?}"),
        }
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    }

    #[derive(Debug)]
    struct Flaky {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FetchXml for Flaky {
        async fn fetch_xml(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError::EmptyBody { url: url.to_string() });
            }
            Ok(RSS.to_string())
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let retry = RetryFetch::new(flaky(2), 3, Duration::from_millis(1), Duration::from_millis(5));
        assert_eq!(retry.fetch_xml("u").await.unwrap(), RSS);
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let retry = RetryFetch::new(flaky(10), 3, Duration::from_millis(1), Duration::from_millis(5));
        assert!(retry.fetch_xml("u").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryFetch::new(flaky(0), 5, Duration::from_millis(1000), Duration::from_millis(5000));
        assert_eq!(retry.backoff(1), Duration::from_millis(1000));
        assert_eq!(retry.backoff(2), Duration::from_millis(2000));
        assert_eq!(retry.backoff(3), Duration::from_millis(4000));
        assert_eq!(retry.backoff(4), Duration::from_millis(5000));
        assert_eq!(retry.backoff(40), Duration::from_millis(5000));
    }
}
