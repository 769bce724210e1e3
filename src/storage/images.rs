use super::schema::Database;
use super::types::{DatabaseError, StoredImage};

impl Database {
    /// Get an image by its exact URL.
    pub async fn find_image_by_url(&self, url: &str) -> Result<Option<StoredImage>, DatabaseError> {
        let row = sqlx::query_as::<_, StoredImage>(
            "SELECT id, url, article_id FROM images WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Record an image for an article. First seen wins: a URL that is already
    /// stored keeps its original owner. Returns `true` when a row was written.
    pub async fn insert_image(&self, url: &str, article_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO images (url, article_id) VALUES (?, ?) ON CONFLICT(url) DO NOTHING",
        )
        .bind(url)
        .bind(article_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total number of stored images.
    pub async fn count_images(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewArticle, NewWebsite};

    #[tokio::test]
    async fn test_first_image_owner_wins() {
        let db = Database::open(":memory:").await.unwrap();
        let (site, _) = db
            .insert_website(&NewWebsite {
                name: "Website_1".to_string(),
                rss: None,
                site_url: None,
                category: "general".to_string(),
                language: "en".to_string(),
                leaning: "center".to_string(),
                country: "Unknown".to_string(),
                last_fetched: 20240101,
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for link in ["https://a.example/1", "https://a.example/2"] {
            db.insert_article(&NewArticle {
                website_id: site.id,
                title: "Title".to_string(),
                summary: "Summary".to_string(),
                link: link.to_string(),
                fetched_on: 20240101,
                fetched_at: 0,
                published_at: None,
            })
            .await
            .unwrap();
            ids.push(db.find_article_by_link(link).await.unwrap().unwrap().id);
        }

        assert!(db.insert_image("https://img.example/x.jpg", ids[0]).await.unwrap());
        assert!(!db.insert_image("https://img.example/x.jpg", ids[1]).await.unwrap());

        let image = db
            .find_image_by_url("https://img.example/x.jpg")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(image.article_id, ids[0]);
        assert_eq!(db.count_images().await.unwrap(), 1);
    }
}
