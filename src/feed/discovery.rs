//! Best-effort discovery of feed endpoints from a site homepage.
//!
//! Publishers often list their feeds on a separate "subscribe" or "RSS" page
//! rather than on the homepage, so discovery walks two levels:
//!
//! 1. Homepage anchors that look like feed pages (`href` containing `rss` or
//!    `/feed`, or own text containing `RSS`).
//! 2. On each of those pages, elements typed `application/rss+xml`, or anchors
//!    whose `href` contains `.rss` or ends in `feed`.
//!
//! A second-level candidate is kept only if fetching it returns a
//! `Content-Type` containing `xml`. Any failure stops discovery and keeps what
//! was found so far.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::http::{self, FetchError};
use crate::util::parse_selector;

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Internal failure that ends a discovery walk early.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("cannot derive base domain from {0}")]
    NoBaseDomain(String),
}

/// Discovers candidate feed URLs for one site.
#[derive(Debug, Clone, Serialize)]
pub struct FeedLinkExtractor {
    #[serde(skip)]
    url: String,
    rss_urls: Vec<String>,
    #[serde(skip)]
    client: reqwest::Client,
    #[serde(skip)]
    timeout: Duration,
}

impl FeedLinkExtractor {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            rss_urls: Vec::new(),
            client,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Walks the site and collects feed URLs. Never fails: on any error the
    /// URLs collected up to that point are kept and the error is logged.
    pub async fn extract_rss_urls(&mut self) -> &[String] {
        if let Err(e) = self.walk().await {
            tracing::debug!(
                site = %self.url,
                found = self.rss_urls.len(),
                error = %e,
                "Feed discovery stopped early"
            );
        }
        tracing::info!(site = %self.url, found = self.rss_urls.len(), "Feed discovery finished");
        &self.rss_urls
    }

    pub fn rss_urls(&self) -> &[String] {
        &self.rss_urls
    }

    /// `{"rss_urls": [...]}` with the candidates found so far.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    async fn walk(&mut self) -> Result<(), DiscoveryError> {
        let homepage = http::fetch(&self.client, &self.url, self.timeout).await?;
        let candidates = subscribe_page_links(&homepage.text(), &self.url);
        tracing::debug!(site = %self.url, candidates = candidates.len(), "Homepage feed-page candidates");

        for page_url in candidates {
            let base = base_domain(&page_url).ok_or_else(|| DiscoveryError::NoBaseDomain(page_url.clone()))?;
            let page = http::fetch(&self.client, &page_url, self.timeout).await?;

            for feed_url in feed_links(&page.text(), &base) {
                let probe = http::fetch(&self.client, &feed_url, self.timeout).await?;
                if probe.content_type.contains("xml") {
                    tracing::debug!(feed = %feed_url, "Discovered feed");
                    self.rss_urls.push(feed_url);
                }
            }
        }

        Ok(())
    }
}

fn anchor_selector() -> Option<&'static Selector> {
    static SEL: OnceLock<Option<Selector>> = OnceLock::new();
    SEL.get_or_init(|| parse_selector("a")).as_ref()
}

fn feed_selector() -> Option<&'static Selector> {
    static SEL: OnceLock<Option<Selector>> = OnceLock::new();
    SEL.get_or_init(|| {
        parse_selector(r#"[type="application/rss+xml"], a[href*=".rss"], a[href$="feed"]"#)
    })
    .as_ref()
}

/// Text directly inside the element, ignoring nested elements.
fn own_text_contains(element: &ElementRef<'_>, needle: &str) -> bool {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .any(|text| text.contains(needle))
}

/// First-level links: homepage anchors that look like they lead to feeds.
fn subscribe_page_links(html: &str, site_url: &str) -> Vec<String> {
    let Some(anchors) = anchor_selector() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(anchors)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let looks_like_feed =
                href.contains("rss") || href.contains("/feed") || own_text_contains(&a, "RSS");
            looks_like_feed.then(|| {
                if href.starts_with('/') {
                    format!("{}{}", site_url.trim_end_matches('/'), href)
                } else {
                    href.to_string()
                }
            })
        })
        .collect()
}

/// Second-level links: feed endpoints listed on a subscribe page.
fn feed_links(html: &str, base: &str) -> Vec<String> {
    let Some(feeds) = feed_selector() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(feeds)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| {
            if href.starts_with('/') {
                format!("{base}{href}")
            } else {
                href.to_string()
            }
        })
        .collect()
}

/// Scheme and host of a URL with any `www.` and userinfo removed,
/// e.g. `https://www.example.com:8080/rss` gives `https://example.com`.
fn base_domain(url: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"^(https?://)?(?:[^@/\n]+@)?(?:www\.)?([^:/\n]+)").ok())
        .as_ref()?;
    let caps = re.captures(url)?;
    let scheme = caps.get(1).map_or("", |m| m.as_str());
    let host = caps.get(2)?.as_str();
    Some(format!("{scheme}{host}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // --- Pure HTML scanning ---

    #[test]
    fn test_subscribe_page_links_match_href_and_text() {
        let html = r#"<html><body>
            <a href="/rss-feeds">Feeds</a>
            <a href="https://example.com/blog/feed">Blog</a>
            <a href="/subscribe">Get our RSS</a>
            <a href="/about">About</a>
            <a>RSS without href</a>
        </body></html>"#;
        let links = subscribe_page_links(html, "https://example.com/");
        assert_eq!(
            links,
            vec![
                "https://example.com/rss-feeds".to_string(),
                "https://example.com/blog/feed".to_string(),
                "https://example.com/subscribe".to_string(),
            ]
        );
    }

    #[test]
    fn test_rss_text_in_nested_element_does_not_count() {
        let html = r#"<a href="/x"><span>RSS</span></a>"#;
        assert!(subscribe_page_links(html, "https://example.com").is_empty());
    }

    #[test]
    fn test_no_matching_anchors() {
        let html = r#"<html><body><a href="/news">News</a><p>Follow our feed</p></body></html>"#;
        assert!(subscribe_page_links(html, "https://example.com").is_empty());
    }

    #[test]
    fn test_feed_links_resolution() {
        let html = r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/world.xml">
        </head><body>
            <a href="https://feeds.example.com/top.rss">Top</a>
            <a href="/sport/feed">Sport</a>
            <a href="/feedback">Feedback</a>
        </body></html>"#;
        let links = feed_links(html, "https://example.com");
        assert_eq!(
            links,
            vec![
                "https://example.com/world.xml".to_string(),
                "https://feeds.example.com/top.rss".to_string(),
                "https://example.com/sport/feed".to_string(),
            ]
        );
    }

    #[test]
    fn test_base_domain() {
        assert_eq!(
            base_domain("https://www.example.com/rss").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            base_domain("http://user@news.example.org:8080/x").as_deref(),
            Some("http://news.example.org")
        );
        assert_eq!(base_domain("example.com/rss").as_deref(), Some("example.com"));
        assert_eq!(base_domain(""), None);
    }

    // --- Network walk with wiremock ---

    #[tokio::test]
    async fn test_two_level_discovery_checks_content_type() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body><a href="{base}/rss">RSS feeds</a></body></html>"#
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body>
                    <a href="{base}/news.rss">News</a>
                    <a href="{base}/fake.rss">Not really</a>
                </body></html>"#
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news.rss"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<rss/>", "application/rss+xml"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fake.rss"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let mut extractor = FeedLinkExtractor::new(reqwest::Client::new(), format!("{base}/"));
        let found = extractor.extract_rss_urls().await.to_vec();
        assert_eq!(found, vec![format!("{base}/news.rss")]);
        assert_eq!(extractor.rss_urls(), found.as_slice());

        let json: serde_json::Value = serde_json::from_str(&extractor.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "rss_urls": [format!("{base}/news.rss")] })
        );
    }

    #[tokio::test]
    async fn test_homepage_without_candidates_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>Hello</body></html>"),
            )
            .mount(&server)
            .await;

        let mut extractor = FeedLinkExtractor::new(reqwest::Client::new(), server.uri());
        assert!(extractor.extract_rss_urls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_site_yields_empty() {
        // Port 9 (discard) on localhost is not listening in test environments
        let mut extractor =
            FeedLinkExtractor::new(reqwest::Client::new(), "http://127.0.0.1:9/")
                .with_timeout(Duration::from_millis(500));
        assert!(extractor.extract_rss_urls().await.is_empty());
    }
}
