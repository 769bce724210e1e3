//! The normalized article handed to downstream consumers.

use rand::seq::IndexedRandom;
use serde::Serialize;
use std::fmt;

use crate::outcome::IngestError;
use crate::storage::{Database, NewArticle, StoredArticle};

/// A normalized news article.
///
/// `published` is the YYYYMMDD marker the store keeps in `fetched_on`: the run
/// date for feed entries, the page's `article:published_time` for scraped
/// URLs when it has one. `published_at` carries the source's own timestamp
/// separately so it is not lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct News {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: i64,
    pub published_at: Option<i64>,
    pub fetched_at: i64,
    pub image_url: Option<String>,
}

/// What [`News::save`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saved {
    pub article_id: i64,
    /// False when the link was already stored (dedup path)
    pub inserted: bool,
    pub image_added: bool,
}

/// Plain-record form of [`News`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsRecord {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: i64,
}

impl News {
    pub fn to_record(&self) -> NewsRecord {
        NewsRecord {
            title: self.title.clone(),
            summary: self.summary.clone(),
            link: self.link.clone(),
            published: self.published,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_record())
    }

    /// Stores the article under `website_id`, deduplicated by link, and
    /// attaches its image if that URL is not recorded yet.
    ///
    /// A link that is already stored keeps its original title and summary,
    /// but the image is still offered to the existing row.
    pub async fn save(&self, db: &Database, website_id: i64) -> Result<Saved, IngestError> {
        let inserted = db
            .insert_article(&NewArticle {
                website_id,
                title: self.title.clone(),
                summary: self.summary.clone(),
                link: self.link.clone(),
                fetched_on: self.published,
                fetched_at: self.fetched_at,
                published_at: self.published_at,
            })
            .await?;

        let article_id = db
            .find_article_by_link(&self.link)
            .await?
            .ok_or_else(|| IngestError::NotFound(format!("article {} after save", self.link)))?
            .id;

        let image_added = match &self.image_url {
            Some(url) => db.insert_image(url, article_id).await?,
            None => false,
        };

        Ok(Saved {
            article_id,
            inserted,
            image_added,
        })
    }
}

impl From<StoredArticle> for News {
    fn from(article: StoredArticle) -> Self {
        Self {
            title: article.title,
            summary: article.summary,
            link: article.link,
            published: article.fetched_on,
            published_at: article.published_at,
            fetched_at: article.fetched_at,
            image_url: article.image_url,
        }
    }
}

impl fmt::Display for News {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {}\nSummary: {}\nLink: {}\nPublished: {}",
            self.title, self.summary, self.link, self.published
        )
    }
}

/// Result of picking a random article.
///
/// `NoContent` is a normal answer, not an error: the source simply has
/// nothing fetched and nothing stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomNews {
    Article(News),
    NoContent,
}

impl RandomNews {
    pub(crate) fn pick(news: &[News]) -> Self {
        match news.choose(&mut rand::rng()) {
            Some(article) => RandomNews::Article(article.clone()),
            None => RandomNews::NoContent,
        }
    }

    pub fn article(&self) -> Option<&News> {
        match self {
            RandomNews::Article(article) => Some(article),
            RandomNews::NoContent => None,
        }
    }
}

impl fmt::Display for RandomNews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RandomNews::Article(article) => fmt::Display::fmt(article, f),
            RandomNews::NoContent => f.write_str("No news available"),
        }
    }
}
