use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the article store.
///
/// Cloning is cheap (the pool is reference counted); every component receives
/// its own clone at construction instead of reaching for a global session.
#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// Pass `":memory:"` for an isolated in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process has the database
    /// locked, `DatabaseError::Migration` if the schema could not be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: concurrent ingestion runs wait on the writer lock
        // instead of failing immediately with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .foreign_keys(true)
            .pragma("busy_timeout", "5000");
        // An in-memory store lives as long as its connections; one connection
        // keeps every query on the same database.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| match DatabaseError::from_sqlx(e) {
            DatabaseError::Locked => DatabaseError::Locked,
            other => DatabaseError::Migration(other.to_string()),
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS websites (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                rss TEXT,
                site_url TEXT,
                category TEXT NOT NULL,
                language TEXT NOT NULL,
                leaning TEXT NOT NULL,
                country TEXT NOT NULL,
                last_fetched INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Adhoc websites have a NULL feed; COALESCE keeps them unique per name too
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_websites_name_rss ON websites(name, COALESCE(rss, ''))",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_websites_name ON websites(name)")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                website_id INTEGER NOT NULL REFERENCES websites(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                fetched_on INTEGER NOT NULL,
                fetched_at INTEGER NOT NULL,
                published_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // History fallback: WHERE website_id = ? ORDER BY id DESC LIMIT ?
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_website ON articles(website_id, id DESC)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_article ON images(article_id)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
