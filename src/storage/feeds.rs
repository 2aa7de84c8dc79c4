use super::schema::Database;
use super::types::{Feed, FeedMetadata, StorageError};

const FEED_COLUMNS: &str = "id, user_id, url, title, description, link, language, copyright, \
     generator, image_url, last_build_date, last_fetched_at, last_fetch_error, \
     is_active, created_at, updated_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Subscribe to a feed. The source URL is unique; the same user
    /// re-subscribing the same URL updates the display title instead of
    /// creating a second row, but a URL already owned by a different user
    /// is [`StorageError::FeedUrlTaken`] — never silently adopted.
    /// Returns the feed ID.
    pub async fn insert_feed(
        &self,
        user_id: &str,
        url: &str,
        title: &str,
    ) -> Result<i64, StorageError> {
        let now = chrono::Utc::now().timestamp();
        // The DO UPDATE WHERE guard makes a cross-user conflict a no-op;
        // RETURNING then yields no row, which maps to the typed error.
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO feeds (user_id, url, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at
            WHERE feeds.user_id = excluded.user_id
            RETURNING id
        "#,
        )
        .bind(user_id)
        .bind(url)
        .bind(title)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id,)| id).ok_or(StorageError::FeedUrlTaken)
    }

    /// Load one feed by ID
    pub async fn get_feed(&self, feed_id: i64) -> Result<Option<Feed>, StorageError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?"
        ))
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// All feeds owned by a user, in subscription order
    pub async fn list_feeds_by_user(&self, user_id: &str) -> Result<Vec<Feed>, StorageError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE user_id = ? ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Active feeds owned by a user, in subscription order.
    ///
    /// This is the enumeration the batch orchestrator walks; outcome order
    /// follows this order.
    pub async fn list_active_feeds_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Feed>, StorageError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             WHERE user_id = ? AND is_active = 1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Soft-enable or soft-disable a feed without touching its articles
    pub async fn set_feed_active(&self, feed_id: i64, active: bool) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE feeds SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Hard-delete a feed; articles cascade via the foreign key
    pub async fn delete_feed(&self, feed_id: i64) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM feeds WHERE id = ?")
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apply a successful fetch: overwrite display metadata with incoming
    /// values, keeping the stored value wherever the document omitted the
    /// field. Clears `last_fetch_error` and stamps `last_fetched_at`.
    pub async fn update_feed_metadata(
        &self,
        feed_id: i64,
        meta: &FeedMetadata,
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE feeds SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                link = COALESCE(?, link),
                language = COALESCE(?, language),
                copyright = COALESCE(?, copyright),
                generator = COALESCE(?, generator),
                image_url = COALESCE(?, image_url),
                last_build_date = COALESCE(?, last_build_date),
                last_fetch_error = NULL,
                last_fetched_at = ?,
                updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(&meta.title)
        .bind(&meta.description)
        .bind(&meta.link)
        .bind(&meta.language)
        .bind(&meta.copyright)
        .bind(&meta.generator)
        .bind(&meta.image_url)
        .bind(meta.last_build_date)
        .bind(now)
        .bind(now)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed fetch attempt: the feed row is never left without a
    /// fresh `last_fetched_at` after an attempt, success or failure.
    pub async fn record_fetch_failure(
        &self,
        feed_id: i64,
        error: &str,
    ) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "UPDATE feeds SET last_fetched_at = ?, last_fetch_error = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(now)
        .bind(error)
        .bind(now)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, FeedMetadata};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_feed_appears_in_list() {
        let db = test_db().await;

        let feed_id = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Example Feed")
            .await
            .unwrap();
        assert!(feed_id > 0);

        let feeds = db.list_feeds_by_user("user-1").await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/feed.xml");
        assert_eq!(feeds[0].title, "Example Feed");
        assert!(feeds[0].is_active);
        assert!(feeds[0].last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_url_updates_title() {
        let db = test_db().await;

        let id1 = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Old Title")
            .await
            .unwrap();
        let id2 = db
            .insert_feed("user-1", "https://example.com/feed.xml", "New Title")
            .await
            .unwrap();

        // Same feed ID (ON CONFLICT DO UPDATE)
        assert_eq!(id1, id2);

        let feeds = db.list_feeds_by_user("user-1").await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].title, "New Title");
    }

    #[tokio::test]
    async fn test_url_owned_by_another_user_is_rejected() {
        let db = test_db().await;

        let id1 = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Theirs")
            .await
            .unwrap();

        let err = db
            .insert_feed("user-2", "https://example.com/feed.xml", "Mine")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::storage::StorageError::FeedUrlTaken));

        // The owner's feed is untouched and the second user gained nothing
        let feed = db.get_feed(id1).await.unwrap().unwrap();
        assert_eq!(feed.user_id, "user-1");
        assert_eq!(feed.title, "Theirs");
        assert!(db.list_feeds_by_user("user-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_excludes_disabled() {
        let db = test_db().await;
        let id1 = db
            .insert_feed("user-1", "https://a.example.com/rss", "A")
            .await
            .unwrap();
        let id2 = db
            .insert_feed("user-1", "https://b.example.com/rss", "B")
            .await
            .unwrap();

        db.set_feed_active(id1, false).await.unwrap();

        let active = db.list_active_feeds_by_user("user-1").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, id2);

        let all = db.list_feeds_by_user("user-1").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_preserves_subscription_order() {
        let db = test_db().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                db.insert_feed(
                    "user-1",
                    &format!("https://feed{i}.example.com/rss"),
                    &format!("Feed {i}"),
                )
                .await
                .unwrap(),
            );
        }

        let feeds = db.list_active_feeds_by_user("user-1").await.unwrap();
        let listed: Vec<i64> = feeds.iter().map(|f| f.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_metadata_update_never_blanks_known_fields() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Example")
            .await
            .unwrap();

        db.update_feed_metadata(
            feed_id,
            &FeedMetadata {
                title: Some("Fresh Title".to_string()),
                description: Some("A description".to_string()),
                language: Some("en".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Refresh with a document that omits description and language
        db.update_feed_metadata(
            feed_id,
            &FeedMetadata {
                title: Some("Fresher Title".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let feed = db.get_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(feed.title, "Fresher Title");
        assert_eq!(feed.description.as_deref(), Some("A description"));
        assert_eq!(feed.language.as_deref(), Some("en"));
        assert!(feed.last_fetch_error.is_none());
        assert!(feed.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_record_fetch_failure_stamps_attempt() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Example")
            .await
            .unwrap();

        db.record_fetch_failure(feed_id, "Request timed out")
            .await
            .unwrap();

        let feed = db.get_feed(feed_id).await.unwrap().unwrap();
        assert_eq!(feed.last_fetch_error.as_deref(), Some("Request timed out"));
        assert!(feed.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_metadata_update_clears_previous_error() {
        let db = test_db().await;
        let feed_id = db
            .insert_feed("user-1", "https://example.com/feed.xml", "Example")
            .await
            .unwrap();

        db.record_fetch_failure(feed_id, "Parse error").await.unwrap();
        db.update_feed_metadata(feed_id, &FeedMetadata::default())
            .await
            .unwrap();

        let feed = db.get_feed(feed_id).await.unwrap().unwrap();
        assert!(feed.last_fetch_error.is_none());
    }

    #[tokio::test]
    async fn test_get_feed_missing_returns_none() {
        let db = test_db().await;
        assert!(db.get_feed(9999).await.unwrap().is_none());
    }
}
