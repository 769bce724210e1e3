use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::discovery::{FeedLinkExtractor, DEFAULT_DISCOVERY_TIMEOUT};
use super::parser::parse_feed;
use super::reader::{
    FeedReader, FeedSource, ReaderSettings, DEFAULT_CATEGORY, DEFAULT_COUNTRY, DEFAULT_LANGUAGE,
    DEFAULT_LEANING,
};
use crate::http;
use crate::outcome::{FeedRunStats, RunAbort};
use crate::storage::{Database, NewWebsite};
use crate::util::today_stamp;

/// A request to add a feed source, either by feed URL or by site URL.
///
/// Missing metadata falls back to the catalog defaults when a new website
/// row is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedRegistration {
    pub name: String,
    pub site_url: Option<String>,
    pub feed_url: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub leaning: Option<String>,
    pub country: Option<String>,
}

impl FeedRegistration {
    pub fn feed(name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed_url: Some(feed_url.into()),
            ..Default::default()
        }
    }

    pub fn site(name: impl Into<String>, site_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site_url: Some(site_url.into()),
            ..Default::default()
        }
    }

    fn source_for(&self, feed_url: &str) -> FeedSource {
        FeedSource {
            name: self.name.clone(),
            feed_url: feed_url.to_string(),
            site_url: self.site_url.clone(),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            leaning: self
                .leaning
                .clone()
                .unwrap_or_else(|| DEFAULT_LEANING.to_string()),
            country: self
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        }
    }
}

/// What happened to one candidate feed URL during [`FeedCatalog::add_feed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Admission {
    /// Validated, persisted and added to the working set
    Registered { feed_url: String },
    /// Already stored; added to the working set from the stored metadata
    Reattached { feed_url: String },
    /// Failed validation
    Rejected { feed_url: String },
    /// A discovered feed that is already stored, or one already in the working set
    Duplicate { feed_url: String },
    /// Store failure while handling the candidate
    Failed { feed_url: String, error: String },
}

impl Admission {
    pub fn feed_url(&self) -> &str {
        match self {
            Admission::Registered { feed_url }
            | Admission::Reattached { feed_url }
            | Admission::Rejected { feed_url }
            | Admission::Duplicate { feed_url }
            | Admission::Failed { feed_url, .. } => feed_url,
        }
    }

    /// Whether the candidate ended up in the working set.
    pub fn is_active(&self) -> bool {
        matches!(self, Admission::Registered { .. } | Admission::Reattached { .. })
    }
}

/// Tunables for the catalog and the readers it creates.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSettings {
    pub validation_timeout: Duration,
    pub discovery_timeout: Duration,
    pub reader: ReaderSettings,
    /// Feeds fetched at once by [`FeedCatalog::read_all`]
    pub fetch_concurrency: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        let reader = ReaderSettings::default();
        Self {
            validation_timeout: reader.fetch_timeout,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            reader,
            fetch_concurrency: 4,
        }
    }
}

/// The working set of feed sources.
///
/// New sources are validated before they are persisted; sources already in
/// the store are reattached from their stored metadata without a network
/// round trip.
#[derive(Debug)]
pub struct FeedCatalog {
    db: Database,
    client: reqwest::Client,
    settings: CatalogSettings,
    feeds: Vec<FeedReader>,
}

impl FeedCatalog {
    pub fn new(db: Database, client: reqwest::Client) -> Self {
        Self {
            db,
            client,
            settings: CatalogSettings::default(),
            feeds: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: CatalogSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn feeds(&self) -> &[FeedReader] {
        &self.feeds
    }

    pub fn feeds_mut(&mut self) -> &mut [FeedReader] {
        &mut self.feeds
    }

    /// Adds a source to the working set.
    ///
    /// With a feed URL the feed is reattached or validated and registered.
    /// With only a site URL, feeds are discovered on the site and each one
    /// goes through the same check. Every failure is logged and reported in
    /// the returned list; one bad candidate never stops the others.
    pub async fn add_feed(&mut self, registration: &FeedRegistration) -> Vec<Admission> {
        if let Some(feed_url) = &registration.feed_url {
            let admission = self.admit_feed_url(registration, feed_url).await;
            return vec![admission];
        }

        if let Some(site_url) = &registration.site_url {
            tracing::info!(name = %registration.name, site = %site_url, "Extracting RSS feeds from site");
            let mut extractor = FeedLinkExtractor::new(self.client.clone(), site_url.clone())
                .with_timeout(self.settings.discovery_timeout);
            let discovered = extractor.extract_rss_urls().await.to_vec();
            if discovered.is_empty() {
                tracing::warn!(name = %registration.name, site = %site_url, "No RSS feeds found on site");
            }

            let mut admissions = Vec::with_capacity(discovered.len());
            for feed_url in discovered {
                admissions.push(self.admit_discovered(registration, &feed_url).await);
            }
            return admissions;
        }

        tracing::warn!(name = %registration.name, "Neither a feed URL nor a site URL was given");
        Vec::new()
    }

    /// Reads every feed in the working set, a bounded number at a time.
    ///
    /// Results come back in working-set order.
    pub async fn read_all(&mut self) -> Vec<(String, Result<FeedRunStats, RunAbort>)> {
        let concurrency = self.settings.fetch_concurrency.max(1);
        stream::iter(self.feeds.iter_mut())
            .map(|reader| async move {
                let name = reader.source().name.clone();
                let result = reader.read_feed().await;
                (name, result)
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn admit_feed_url(&mut self, registration: &FeedRegistration, feed_url: &str) -> Admission {
        let name = &registration.name;
        if self.is_active(name, feed_url) {
            tracing::debug!(name = %name, feed = %feed_url, "Feed already in working set");
            return Admission::Duplicate {
                feed_url: feed_url.to_string(),
            };
        }

        match self.db.find_website(name, feed_url).await {
            Ok(Some(website)) => {
                tracing::info!(name = %name, feed = %feed_url, "Feed already in database");
                let source =
                    FeedSource::from_website(&website, feed_url, registration.site_url.clone());
                self.activate(source);
                Admission::Reattached {
                    feed_url: feed_url.to_string(),
                }
            }
            Ok(None) => {
                if self.validate_feed(feed_url).await {
                    self.register(registration, feed_url).await
                } else {
                    tracing::warn!(name = %name, feed = %feed_url, "Feed validation failed");
                    self.bump_last_fetched(name, feed_url).await;
                    Admission::Rejected {
                        feed_url: feed_url.to_string(),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(name = %name, feed = %feed_url, error = %e, "Error retrieving website from database");
                Admission::Failed {
                    feed_url: feed_url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn admit_discovered(&mut self, registration: &FeedRegistration, feed_url: &str) -> Admission {
        let name = &registration.name;
        match self.db.find_website(name, feed_url).await {
            Ok(Some(_)) => {
                tracing::info!(name = %name, feed = %feed_url, "Extracted feed already in database");
                Admission::Duplicate {
                    feed_url: feed_url.to_string(),
                }
            }
            Ok(None) => {
                if self.validate_feed(feed_url).await {
                    self.register(registration, feed_url).await
                } else {
                    tracing::warn!(name = %name, feed = %feed_url, "Extracted feed validation failed");
                    Admission::Rejected {
                        feed_url: feed_url.to_string(),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(name = %name, feed = %feed_url, error = %e, "Error checking extracted feed");
                Admission::Failed {
                    feed_url: feed_url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Persists the website row first, then adds the reader.
    async fn register(&mut self, registration: &FeedRegistration, feed_url: &str) -> Admission {
        let source = registration.source_for(feed_url);
        let row = NewWebsite {
            name: source.name.clone(),
            rss: Some(source.feed_url.clone()),
            site_url: source.site_url.clone(),
            category: source.category.clone(),
            language: source.language.clone(),
            leaning: source.leaning.clone(),
            country: source.country.clone(),
            last_fetched: today_stamp(),
        };

        match self.db.insert_website(&row).await {
            Ok((_, created)) => {
                if !created {
                    tracing::debug!(name = %source.name, feed = %feed_url, "Website row written concurrently");
                }
                tracing::info!(name = %source.name, feed = %feed_url, "Adding feed");
                self.activate(source);
                Admission::Registered {
                    feed_url: feed_url.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(name = %source.name, feed = %feed_url, error = %e, "Failed to persist website");
                Admission::Failed {
                    feed_url: feed_url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Light check that a URL serves a parseable feed.
    ///
    /// An empty feed still passes, with a warning.
    pub async fn validate_feed(&self, feed_url: &str) -> bool {
        let fetched =
            match http::fetch_success(&self.client, feed_url, self.settings.validation_timeout).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!(feed = %feed_url, error = %e, "Error validating feed");
                    return false;
                }
            };

        match parse_feed(&fetched.body) {
            Ok(entries) => {
                if entries.is_empty() {
                    tracing::warn!(feed = %feed_url, "Feed has no entries");
                }
                true
            }
            Err(e) => {
                tracing::warn!(feed = %feed_url, error = %e, "Error validating feed");
                false
            }
        }
    }

    async fn bump_last_fetched(&self, name: &str, feed_url: &str) {
        if let Err(e) = self
            .db
            .touch_website_last_fetched(name, feed_url, today_stamp())
            .await
        {
            tracing::warn!(name = %name, feed = %feed_url, error = %e, "Error updating last_fetched time");
        }
    }

    fn is_active(&self, name: &str, feed_url: &str) -> bool {
        self.feeds
            .iter()
            .any(|r| r.source().name == name && r.source().feed_url == feed_url)
    }

    fn activate(&mut self, source: FeedSource) {
        let reader = FeedReader::new(self.db.clone(), self.client.clone(), source)
            .with_settings(self.settings.reader);
        self.feeds.push(reader);
    }
}
