use super::schema::Database;
use super::types::{DatabaseError, NewWebsite, Website};

const WEBSITE_COLUMNS: &str =
    "id, name, rss, site_url, category, language, leaning, country, last_fetched";

impl Database {
    // ========================================================================
    // Website Queries
    // ========================================================================

    /// Look up a feed source by its `(name, feed URL)` uniqueness key.
    pub async fn find_website(
        &self,
        name: &str,
        rss: &str,
    ) -> Result<Option<Website>, DatabaseError> {
        let row = sqlx::query_as::<_, Website>(&format!(
            "SELECT {WEBSITE_COLUMNS} FROM websites WHERE name = ? AND rss = ?"
        ))
        .bind(name)
        .bind(rss)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Look up the first website registered under `name`, feed or adhoc.
    pub async fn find_website_by_name(&self, name: &str) -> Result<Option<Website>, DatabaseError> {
        let row = sqlx::query_as::<_, Website>(&format!(
            "SELECT {WEBSITE_COLUMNS} FROM websites WHERE name = ? ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ========================================================================
    // Website Mutations
    // ========================================================================

    /// Insert a website, returning the stored row.
    ///
    /// The `(name, feed)` unique index decides: if a concurrent writer already
    /// inserted the same key, the existing row is returned unchanged.
    /// The boolean is `true` when this call created the row.
    pub async fn insert_website(
        &self,
        website: &NewWebsite,
    ) -> Result<(Website, bool), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO websites (name, rss, site_url, category, language, leaning, country, last_fetched)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
        "#,
        )
        .bind(&website.name)
        .bind(&website.rss)
        .bind(&website.site_url)
        .bind(&website.category)
        .bind(&website.language)
        .bind(&website.leaning)
        .bind(&website.country)
        .bind(website.last_fetched)
        .execute(&self.pool)
        .await?;
        let created = result.rows_affected() > 0;

        let stored = sqlx::query_as::<_, Website>(&format!(
            "SELECT {WEBSITE_COLUMNS} FROM websites WHERE name = ? AND COALESCE(rss, '') = COALESCE(?, '')"
        ))
        .bind(&website.name)
        .bind(&website.rss)
        .fetch_one(&self.pool)
        .await?;

        Ok((stored, created))
    }

    /// Move `last_fetched` forward for a feed source.
    ///
    /// Only rows whose stamp is older than `stamp` are touched, so the value
    /// never goes backwards. Returns whether a row was updated.
    pub async fn touch_website_last_fetched(
        &self,
        name: &str,
        rss: &str,
        stamp: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE websites SET last_fetched = ? WHERE name = ? AND rss = ? AND last_fetched < ?",
        )
        .bind(stamp)
        .bind(name)
        .bind(rss)
        .bind(stamp)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
