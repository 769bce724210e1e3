use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::parser::{parse_feed, FeedEntry};
use crate::http;
use crate::news::{News, RandomNews};
use crate::outcome::{FeedRunStats, IngestError, ItemOutcome, RunAbort};
use crate::storage::{Database, Website};
use crate::util::{now_unix, today_stamp};

pub const DEFAULT_COUNTRY: &str = "Unknown";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_LEANING: &str = "center";
pub const DEFAULT_CATEGORY: &str = "general";

/// A registered feed source with its descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub feed_url: String,
    pub site_url: Option<String>,
    pub category: String,
    pub language: String,
    pub leaning: String,
    pub country: String,
}

impl FeedSource {
    /// A source with default metadata.
    pub fn new(name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed_url: feed_url.into(),
            site_url: None,
            category: DEFAULT_CATEGORY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            leaning: DEFAULT_LEANING.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Rebuilds a source from its stored website row.
    pub fn from_website(website: &Website, feed_url: &str, site_url: Option<String>) -> Self {
        Self {
            name: website.name.clone(),
            feed_url: feed_url.to_string(),
            site_url: site_url.or_else(|| website.site_url.clone()),
            category: website.category.clone(),
            language: website.language.clone(),
            leaning: website.leaning.clone(),
            country: website.country.clone(),
        }
    }
}

/// Tunables for a feed run.
#[derive(Debug, Clone, Copy)]
pub struct ReaderSettings {
    pub fetch_timeout: Duration,
    /// How many stored articles to load when a run processes nothing
    pub history_limit: i64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            history_limit: 10,
        }
    }
}

/// Serializable view of a reader and its current article list.
#[derive(Debug, Serialize)]
pub struct FeedSnapshot<'a> {
    #[serde(flatten)]
    pub source: &'a FeedSource,
    pub news: Vec<crate::news::NewsRecord>,
}

/// Pulls one feed, normalizes its entries and stores them.
///
/// The reader keeps the articles of its latest run in memory. When a run
/// yields nothing usable the list is filled from the most recent stored
/// articles of the same website instead.
#[derive(Clone)]
pub struct FeedReader {
    source: FeedSource,
    news: Vec<News>,
    db: Database,
    client: reqwest::Client,
    settings: ReaderSettings,
}

impl std::fmt::Debug for FeedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedReader")
            .field("source", &self.source)
            .field("news", &self.news.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl FeedReader {
    pub fn new(db: Database, client: reqwest::Client, source: FeedSource) -> Self {
        Self {
            source,
            news: Vec::new(),
            db,
            client,
            settings: ReaderSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReaderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Articles currently held in memory, without touching the store.
    pub fn news(&self) -> &[News] {
        &self.news
    }

    /// Fetches the feed and ingests every entry in order.
    ///
    /// Entry failures are counted and never stop the run. A fetch or parse
    /// failure is recorded in [`FeedRunStats::fetch_error`] and leads to the
    /// history fallback.
    ///
    /// # Errors
    ///
    /// [`RunAbort::WebsiteNotRegistered`] if the source was never added to the
    /// store; the in-memory list is left untouched in that case.
    pub async fn read_feed(&mut self) -> Result<FeedRunStats, RunAbort> {
        let run_date = today_stamp();
        let fetched_at = now_unix();

        let website = match self
            .db
            .find_website(&self.source.name, &self.source.feed_url)
            .await
        {
            Ok(Some(website)) => website,
            Ok(None) => {
                tracing::error!(
                    name = %self.source.name,
                    feed = %self.source.feed_url,
                    "Website not found in database"
                );
                return Err(RunAbort::WebsiteNotRegistered {
                    name: self.source.name.clone(),
                    feed_url: self.source.feed_url.clone(),
                });
            }
            Err(e) => {
                tracing::error!(name = %self.source.name, error = %e, "Website lookup failed");
                return Err(RunAbort::Store(e));
            }
        };

        tracing::info!(name = %self.source.name, feed = %self.source.feed_url, "Processing feed");
        self.news.clear();
        let mut stats = FeedRunStats::default();

        match self.fetch_entries().await {
            Ok(entries) => {
                stats.total_entries = entries.len();
                tracing::debug!(feed = %self.source.feed_url, entries = entries.len(), "Feed parsed");

                for entry in entries {
                    let title = entry.title.clone().unwrap_or_else(|| "Unknown".to_string());
                    let outcome = match self.ingest_entry(website.id, entry, run_date, fetched_at).await {
                        Ok((news, outcome)) => {
                            self.news.push(news);
                            outcome
                        }
                        Err(e) => {
                            tracing::warn!(feed = %self.source.feed_url, title = %title, error = %e, "Error processing entry");
                            ItemOutcome::Failed(e)
                        }
                    };
                    stats.record(&outcome);
                }
            }
            Err(e) => {
                tracing::warn!(feed = %self.source.feed_url, error = %e, "Feed fetch failed");
                stats.fetch_error = Some(e.to_string());
            }
        }

        if stats.processed == 0 {
            stats.loaded_from_history = self.load_history(website.id).await;
        }
        stats.in_memory = self.news.len();

        tracing::info!(
            name = %self.source.name,
            total_entries = stats.total_entries,
            processed = stats.processed,
            inserted = stats.inserted,
            errors = stats.errors,
            images_added = stats.images_added,
            from_history = stats.loaded_from_history,
            in_memory = stats.in_memory,
            "Feed processing summary"
        );

        Ok(stats)
    }

    /// All in-memory articles, loading stored history first if the list is empty.
    pub async fn all_news(&mut self) -> &[News] {
        if self.news.is_empty() {
            match self
                .db
                .find_website(&self.source.name, &self.source.feed_url)
                .await
            {
                Ok(Some(website)) => {
                    self.load_history(website.id).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(name = %self.source.name, error = %e, "Error fetching articles from database");
                }
            }
        }
        &self.news
    }

    /// A random article, or [`RandomNews::NoContent`] when nothing was fetched
    /// and nothing is stored.
    pub async fn random_news(&mut self) -> RandomNews {
        RandomNews::pick(self.all_news().await)
    }

    pub fn to_record(&self) -> FeedSnapshot<'_> {
        FeedSnapshot {
            source: &self.source,
            news: self.news.iter().map(News::to_record).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_record())
    }

    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, IngestError> {
        let fetched =
            http::fetch_success(&self.client, &self.source.feed_url, self.settings.fetch_timeout)
                .await?;
        parse_feed(&fetched.body).map_err(|e| IngestError::Parse(e.to_string()))
    }

    async fn ingest_entry(
        &self,
        website_id: i64,
        entry: FeedEntry,
        run_date: i64,
        fetched_at: i64,
    ) -> Result<(News, ItemOutcome), IngestError> {
        let link = entry
            .link
            .ok_or_else(|| IngestError::Validation("entry has no link".to_string()))?;
        let title = entry
            .title
            .ok_or_else(|| IngestError::Validation(format!("entry {link} has no title")))?;

        // The run date is the article's marker; the feed's own date is kept
        // alongside in published_at.
        let news = News {
            title,
            summary: entry.summary.unwrap_or_default(),
            link,
            published: run_date,
            published_at: entry.published_at,
            fetched_at,
            image_url: entry.image_url,
        };

        let saved = news.save(&self.db, website_id).await?;
        let outcome = ItemOutcome::Processed {
            inserted: saved.inserted,
            image_added: saved.image_added,
        };
        Ok((news, outcome))
    }

    /// Replaces the in-memory list with the newest stored articles of the
    /// website. Returns how many were loaded.
    async fn load_history(&mut self, website_id: i64) -> usize {
        match self
            .db
            .recent_articles_for_website(website_id, self.settings.history_limit)
            .await
        {
            Ok(articles) => {
                if !articles.is_empty() {
                    tracing::info!(
                        name = %self.source.name,
                        count = articles.len(),
                        "Loading existing articles from database"
                    );
                }
                self.news = articles.into_iter().map(News::from).collect();
                self.news.len()
            }
            Err(e) => {
                tracing::warn!(name = %self.source.name, error = %e, "Error fetching articles from database");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewWebsite;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TWO_ITEMS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>One</title><link>https://news.example/1</link><description>First</description></item>
    <item><title>Two</title><link>https://news.example/2</link><description>Second</description></item>
</channel></rss>"#;

    async fn registered(db: &Database, source: &FeedSource) {
        db.insert_website(&NewWebsite {
            name: source.name.clone(),
            rss: Some(source.feed_url.clone()),
            site_url: None,
            category: source.category.clone(),
            language: source.language.clone(),
            leaning: source.leaning.clone(),
            country: source.country.clone(),
            last_fetched: 20240101,
        })
        .await
        .unwrap();
    }

    async fn serve(body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_raw(body, "application/rss+xml"),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_unregistered_website_aborts() {
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Nobody", "https://nobody.example/rss");
        let mut reader = FeedReader::new(db, reqwest::Client::new(), source);

        match reader.read_feed().await {
            Err(RunAbort::WebsiteNotRegistered { name, .. }) => assert_eq!(name, "Nobody"),
            other => panic!("Expected WebsiteNotRegistered, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_stamps_run_date_and_keeps_feed_date() {
        let server = serve(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Dated</title><link>https://news.example/d</link><description>S</description>
    <pubDate>Tue, 05 Mar 2024 10:00:00 GMT</pubDate></item>
</channel></rss>"#,
            200,
        )
        .await;
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Daily", format!("{}/rss", server.uri()));
        registered(&db, &source).await;

        let mut reader = FeedReader::new(db.clone(), reqwest::Client::new(), source);
        reader.read_feed().await.unwrap();

        let news = &reader.news()[0];
        assert_eq!(news.published, today_stamp());
        assert_eq!(news.published_at, Some(1709632800));

        let stored = db
            .find_article_by_link("https://news.example/d")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.fetched_on, today_stamp());
        assert_eq!(stored.published_at, Some(1709632800));
    }

    #[tokio::test]
    async fn test_entry_without_link_counts_as_error() {
        let server = serve(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid isPermaLink="false">x</guid><title>No link here</title></item>
    <item><title>Linked</title><link>https://news.example/ok</link></item>
</channel></rss>"#,
            200,
        )
        .await;
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Daily", format!("{}/rss", server.uri()));
        registered(&db, &source).await;

        let mut reader = FeedReader::new(db, reqwest::Client::new(), source);
        let stats = reader.read_feed().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(reader.news()[0].summary, "");
    }

    #[tokio::test]
    async fn test_second_run_replaces_in_memory_list() {
        let server = serve(TWO_ITEMS, 200).await;
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Daily", format!("{}/rss", server.uri()));
        registered(&db, &source).await;

        let mut reader = FeedReader::new(db.clone(), reqwest::Client::new(), source);
        let first = reader.read_feed().await.unwrap();
        let second = reader.read_feed().await.unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.processed, 2);
        assert_eq!(reader.news().len(), 2);
        assert_eq!(db.count_articles().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_http_error_falls_back_to_history() {
        let server = serve("gone", 500).await;
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Daily", format!("{}/rss", server.uri()));
        registered(&db, &source).await;

        let mut reader = FeedReader::new(db, reqwest::Client::new(), source);
        let stats = reader.read_feed().await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert!(stats.fetch_error.is_some());
        assert_eq!(stats.in_memory, 0);
        assert_eq!(reader.random_news().await, RandomNews::NoContent);
    }

    #[tokio::test]
    async fn test_snapshot_json_includes_source_and_news() {
        let server = serve(TWO_ITEMS, 200).await;
        let db = Database::open(":memory:").await.unwrap();
        let source = FeedSource::new("Daily", format!("{}/rss", server.uri()));
        registered(&db, &source).await;

        let mut reader = FeedReader::new(db, reqwest::Client::new(), source);
        reader.read_feed().await.unwrap();

        let json: serde_json::Value = serde_json::from_str(&reader.to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "Daily");
        assert_eq!(json["leaning"], "center");
        assert_eq!(json["news"].as_array().unwrap().len(), 2);
        assert_eq!(json["news"][0]["title"], "One");
    }
}
