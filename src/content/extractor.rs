use futures::stream::{self, StreamExt};
use std::time::Duration;

use super::scrape::{scrape_article, ScrapedPage};
use super::url_filter::check_article_url;
use crate::feed::reader::{DEFAULT_CATEGORY, DEFAULT_COUNTRY, DEFAULT_LANGUAGE, DEFAULT_LEANING};
use crate::http::{self, FetchError, Fetched};
use crate::news::News;
use crate::outcome::{IngestError, ItemOutcome, SkipReason, UrlRunStats};
use crate::storage::{Database, NewWebsite, Website};
use crate::util::{now_unix, today_stamp};

pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WEBSITE_PREFIX: &str = "Website";
pub const MIN_TITLE_CHARS: usize = 5;
pub const MIN_SUMMARY_CHARS: usize = 10;

/// Turns arbitrary article URLs into stored news.
///
/// URLs are filtered once at construction. Each surviving URL is its own
/// adhoc source, stored as a website named `{prefix}_{n}` with no feed.
#[derive(Debug)]
pub struct UrlContentExtractor {
    db: Database,
    client: reqwest::Client,
    urls: Vec<String>,
    website_name_prefix: String,
    articles: Vec<News>,
    timeout: Duration,
    concurrency: usize,
}

impl UrlContentExtractor {
    pub fn new<I, S>(db: Database, client: reqwest::Client, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls = urls
            .into_iter()
            .map(Into::into)
            .filter(|url| match check_article_url(url) {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(url = %url, reason = %e, "URL filtered out");
                    false
                }
            })
            .collect();

        Self {
            db,
            client,
            urls,
            website_name_prefix: DEFAULT_WEBSITE_PREFIX.to_string(),
            articles: Vec::new(),
            timeout: DEFAULT_PAGE_TIMEOUT,
            concurrency: 4,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.website_name_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// URLs that passed the filter.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Articles stored by the latest run.
    pub fn articles(&self) -> &[News] {
        &self.articles
    }

    /// Fetches, scrapes and stores every URL.
    ///
    /// Pages are fetched a few at a time but handled in input order, so the
    /// `n` in `{prefix}_{n}` always matches the URL's position.
    pub async fn process_urls(&mut self) -> UrlRunStats {
        let run_date = today_stamp();
        let fetched_at = now_unix();
        let total = self.urls.len();
        let mut stats = UrlRunStats {
            total_urls: total,
            ..Default::default()
        };
        self.articles.clear();

        let client = self.client.clone();
        let timeout = self.timeout;
        let urls = self.urls.clone();
        let mut pages = stream::iter(urls.into_iter().enumerate())
            .map(|(idx, url)| {
                let client = client.clone();
                async move {
                    let fetched = http::fetch(&client, &url, timeout).await;
                    (idx, url, fetched)
                }
            })
            .buffered(self.concurrency);

        while let Some((idx, url, fetched)) = pages.next().await {
            tracing::info!(url = %url, "Processing URL {}/{}", idx + 1, total);
            let outcome = match self.ingest(idx, &url, fetched, run_date, fetched_at).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Error processing URL");
                    ItemOutcome::Failed(e)
                }
            };
            if let ItemOutcome::Skipped(reason) = &outcome {
                tracing::warn!(url = %url, reason = %reason, "Skipping URL");
            }
            stats.record(&outcome);
        }

        tracing::info!(
            total_urls = stats.total_urls,
            processed = stats.processed,
            skipped = stats.skipped,
            errors = stats.errors,
            images_added = stats.images_added,
            in_memory = self.articles.len(),
            "URL news processing summary"
        );
        stats
    }

    async fn ingest(
        &mut self,
        idx: usize,
        url: &str,
        fetched: Result<Fetched, FetchError>,
        run_date: i64,
        fetched_at: i64,
    ) -> Result<ItemOutcome, IngestError> {
        let page = fetched?;
        if let Some(reason) = reject_response(&page) {
            return Ok(ItemOutcome::Skipped(reason));
        }

        let scraped = scrape_article(&page.text(), url, run_date);
        if let Some(reason) = quality_gate(&scraped) {
            return Ok(ItemOutcome::Skipped(reason));
        }

        let website_name = format!("{}_{}", self.website_name_prefix, idx + 1);
        let website = self.adhoc_website(&website_name, scraped.published).await?;

        let news = News {
            title: scraped.title,
            summary: scraped.summary,
            link: url.to_string(),
            published: scraped.published,
            published_at: scraped.published_at,
            fetched_at,
            image_url: scraped.image_url,
        };
        let saved = news.save(&self.db, website.id).await?;
        self.articles.push(news);

        Ok(ItemOutcome::Processed {
            inserted: saved.inserted,
            image_added: saved.image_added,
        })
    }

    /// Existing website with this name, or a new adhoc one.
    async fn adhoc_website(&self, name: &str, stamp: i64) -> Result<Website, IngestError> {
        if let Some(website) = self.db.find_website_by_name(name).await? {
            return Ok(website);
        }
        let (website, _) = self
            .db
            .insert_website(&NewWebsite {
                name: name.to_string(),
                rss: None,
                site_url: None,
                category: DEFAULT_CATEGORY.to_string(),
                language: DEFAULT_LANGUAGE.to_string(),
                leaning: DEFAULT_LEANING.to_string(),
                country: DEFAULT_COUNTRY.to_string(),
                last_fetched: stamp,
            })
            .await?;
        Ok(website)
    }
}

fn reject_response(page: &Fetched) -> Option<SkipReason> {
    if page.status != 200 {
        return Some(SkipReason::BadStatus(page.status));
    }
    let ct = &page.content_type;
    if !(ct.contains("text/html") || ct.contains("application/xhtml")) {
        return Some(SkipReason::NotHtml(ct.clone()));
    }
    None
}

fn quality_gate(page: &ScrapedPage) -> Option<SkipReason> {
    let title_len = page.title.chars().count();
    if title_len < MIN_TITLE_CHARS {
        return Some(SkipReason::TitleTooShort(title_len));
    }
    let summary_len = page.summary.chars().count();
    if summary_len < MIN_SUMMARY_CHARS {
        return Some(SkipReason::SummaryTooShort(summary_len));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(title: &str, summary: &str) -> ScrapedPage {
        ScrapedPage {
            title: title.to_string(),
            summary: summary.to_string(),
            published: 20240101,
            published_at: None,
            image_url: None,
        }
    }

    fn html_page(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
    }

    #[test]
    fn test_quality_gate_thresholds() {
        assert_eq!(
            quality_gate(&page("abcd", "0123456789")),
            Some(SkipReason::TitleTooShort(4))
        );
        assert_eq!(
            quality_gate(&page("abcde", "012345678")),
            Some(SkipReason::SummaryTooShort(9))
        );
        assert_eq!(quality_gate(&page("abcde", "0123456789")), None);
        // Characters, not bytes
        assert_eq!(quality_gate(&page("ééééé", "日本語のニュースです。")), None);
    }

    #[test]
    fn test_reject_response() {
        let ok = Fetched {
            status: 200,
            content_type: "application/xhtml+xml".to_string(),
            body: Vec::new(),
        };
        assert_eq!(reject_response(&ok), None);

        let json = Fetched {
            status: 200,
            content_type: "application/json".to_string(),
            body: Vec::new(),
        };
        assert!(matches!(reject_response(&json), Some(SkipReason::NotHtml(_))));

        let moved = Fetched {
            status: 204,
            content_type: "text/html".to_string(),
            body: Vec::new(),
        };
        assert_eq!(reject_response(&moved), Some(SkipReason::BadStatus(204)));
    }

    #[tokio::test]
    async fn test_short_title_page_skipped_before_any_write() {
        let db = Database::open(":memory:").await.unwrap();
        let url = "https://example.com/tiny";
        let mut extractor = UrlContentExtractor::new(db.clone(), reqwest::Client::new(), [url]);
        let fetched = Ok(Fetched {
            status: 200,
            content_type: "text/html".to_string(),
            body: b"<html><head><title>Hi</title></head><body><p>Short</p></body></html>".to_vec(),
        });

        let outcome = extractor
            .ingest(0, url, fetched, 20240101, 1704067200)
            .await
            .unwrap();
        assert!(
            matches!(outcome, ItemOutcome::Skipped(SkipReason::TitleTooShort(2))),
            "unexpected outcome: {:?}",
            outcome
        );
        assert!(extractor.articles().is_empty());
        assert!(db.find_website_by_name("Website_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filter_runs_before_counting() {
        let db = Database::open(":memory:").await.unwrap();
        let extractor = UrlContentExtractor::new(
            db,
            reqwest::Client::new(),
            ["https://youtube.com/watch?v=1", "https://example.com/a.png", "https://example.com/story"],
        );
        assert_eq!(extractor.urls(), &["https://example.com/story".to_string()]);
    }

    #[tokio::test]
    async fn test_adhoc_websites_follow_input_position() {
        let server = MockServer::start().await;
        for (p, title) in [("/a", "First story"), ("/b", "Second story")] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(html_page(format!(
                    r#"<html><head><title>{title}</title>
                    <meta name="description" content="Long enough summary for {title}.">
                    <meta property="og:image" content="/img{p}.jpg?size=large">
                    </head></html>"#
                )))
                .mount(&server)
                .await;
        }

        let db = Database::open(":memory:").await.unwrap();
        let base = server.uri();
        let mut extractor = UrlContentExtractor::new(
            db.clone(),
            reqwest::Client::new(),
            vec![format!("{base}/a"), format!("{base}/b")],
        )
        .with_prefix("Adhoc");

        let stats = extractor.process_urls().await;
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.images_added, 2);
        assert_eq!(extractor.articles()[1].title, "Second story");

        let second = db.find_website_by_name("Adhoc_2").await.unwrap().unwrap();
        assert!(second.is_adhoc());
        let stored = db
            .find_article_by_link(&format!("{base}/b"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.website_id, second.id);
        assert_eq!(stored.image_url, Some(format!("{base}/img/b.jpg")));

        // Same URLs again: nothing new is written
        let again = extractor.process_urls().await;
        assert_eq!(again.processed, 2);
        assert_eq!(again.images_added, 0);
        assert_eq!(db.count_articles().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error_not_a_skip() {
        let db = Database::open(":memory:").await.unwrap();
        let mut extractor = UrlContentExtractor::new(
            db,
            reqwest::Client::new(),
            ["http://127.0.0.1:9/story"],
        )
        .with_timeout(Duration::from_millis(500));

        let stats = extractor.process_urls().await;
        assert_eq!(stats.total_urls, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.skipped, 0);
    }
}
