use super::schema::Database;
use super::types::{DatabaseError, NewArticle, StoredArticle};

/// Hard cap for history queries regardless of the requested limit
const MAX_ARTICLES: i64 = 500;

impl Database {
    // ========================================================================
    // Article Queries
    // ========================================================================

    /// Get an article by its link (the global uniqueness key).
    pub async fn find_article_by_link(
        &self,
        link: &str,
    ) -> Result<Option<StoredArticle>, DatabaseError> {
        let row = sqlx::query_as::<_, StoredArticle>(
            r#"
            SELECT a.id, a.website_id, a.title, a.summary, a.link,
                   a.fetched_on, a.fetched_at, a.published_at,
                   (SELECT i.url FROM images i WHERE i.article_id = a.id ORDER BY i.id LIMIT 1) AS image_url
            FROM articles a
            WHERE a.link = ?
        "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Most recently inserted articles of a website, newest first.
    ///
    /// Ordered by insertion (row id), not by any reported date.
    pub async fn recent_articles_for_website(
        &self,
        website_id: i64,
        limit: i64,
    ) -> Result<Vec<StoredArticle>, DatabaseError> {
        let limit = limit.clamp(0, MAX_ARTICLES);
        tracing::debug!(website_id, limit, "recent_articles_for_website");

        let rows = sqlx::query_as::<_, StoredArticle>(
            r#"
            SELECT a.id, a.website_id, a.title, a.summary, a.link,
                   a.fetched_on, a.fetched_at, a.published_at,
                   (SELECT i.url FROM images i WHERE i.article_id = a.id ORDER BY i.id LIMIT 1) AS image_url
            FROM articles a
            WHERE a.website_id = ?
            ORDER BY a.id DESC
            LIMIT ?
        "#,
        )
        .bind(website_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Total number of stored articles.
    pub async fn count_articles(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    // ========================================================================
    // Article Mutations
    // ========================================================================

    /// Insert an article unless its link is already stored.
    ///
    /// The UNIQUE(link) constraint is the dedup authority: a conflicting insert
    /// is silently dropped, leaving the first title/summary in place.
    /// Returns `true` when a new row was written.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (website_id, title, summary, link, fetched_on, fetched_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
        "#,
        )
        .bind(article.website_id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.link)
        .bind(article.fetched_on)
        .bind(article.fetched_at)
        .bind(article.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
