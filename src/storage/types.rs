use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database
    #[error("Database is locked by another process. Please retry once it finishes.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Insert Types
// ============================================================================

/// A website row to be inserted.
///
/// `rss` is `None` for adhoc sources created from arbitrary URLs.
#[derive(Debug, Clone)]
pub struct NewWebsite {
    pub name: String,
    pub rss: Option<String>,
    pub site_url: Option<String>,
    pub category: String,
    pub language: String,
    pub leaning: String,
    pub country: String,
    /// YYYYMMDD
    pub last_fetched: i64,
}

/// An article row to be inserted.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub website_id: i64,
    pub title: String,
    pub summary: String,
    pub link: String,
    /// YYYYMMDD marker stamped by the ingesting run
    pub fetched_on: i64,
    /// Unix seconds, always the moment of ingestion
    pub fetched_at: i64,
    /// Unix seconds as reported by the source, when it reported one
    pub published_at: Option<i64>,
}

// ============================================================================
// Data Structures
// ============================================================================

/// Website (news source) data from database
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Website {
    pub id: i64,
    pub name: String,
    pub rss: Option<String>,
    pub site_url: Option<String>,
    pub category: String,
    pub language: String,
    pub leaning: String,
    pub country: String,
    pub last_fetched: i64,
}

impl Website {
    /// Adhoc websites own articles scraped from arbitrary URLs and have no feed.
    pub fn is_adhoc(&self) -> bool {
        self.rss.is_none()
    }
}

/// Article data from database
///
/// `image_url` is only populated by queries that join the images table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub website_id: i64,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub fetched_on: i64,
    pub fetched_at: i64,
    pub published_at: Option<i64>,
    #[sqlx(default)]
    pub image_url: Option<String>,
}

/// Image reference from database
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredImage {
    pub id: i64,
    pub url: String,
    pub article_id: i64,
}
