use super::schema::Database;
use super::types::{Article, ArticleCounts, NewArticle, StorageError};

const ARTICLE_COLUMNS: &str = "id, feed_id, guid, title, link, description, content, author, \
     categories, image_url, enclosure_url, enclosure_type, enclosure_length, \
     pub_date, is_read, is_starred, created_at";

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Dedup lookup: find an article by its global guid
    pub async fn find_article_by_guid(
        &self,
        guid: &str,
    ) -> Result<Option<Article>, StorageError> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE guid = ?"
        ))
        .bind(guid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    /// Load one article by ID
    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>, StorageError> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"
        ))
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    /// Insert a new article. First-seen wins: there is no upsert here — a
    /// guid collision (concurrent fetch of the same entry) surfaces as
    /// [`StorageError::DuplicateKey`], which the fetcher absorbs.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<Article, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let inserted = sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles \
                (feed_id, guid, title, link, description, content, author, categories, \
                 image_url, enclosure_url, enclosure_type, enclosure_length, pub_date, \
                 created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(article.feed_id)
        .bind(&article.guid)
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.author)
        .bind(&article.categories)
        .bind(&article.image_url)
        .bind(&article.enclosure_url)
        .bind(&article.enclosure_type)
        .bind(article.enclosure_length)
        .bind(article.pub_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(inserted)
    }

    /// Articles for one feed, newest first. Articles without a publish
    /// timestamp are chronologically unknown and sort last.
    pub async fn list_articles_for_feed(
        &self,
        feed_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>, StorageError> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE feed_id = ? \
             ORDER BY pub_date IS NULL, pub_date DESC, id DESC \
             LIMIT ? OFFSET ?"
        ))
        .bind(feed_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(articles)
    }

    /// Set the read flag on an article, returning the updated row
    pub async fn mark_article_read(
        &self,
        article_id: i64,
        is_read: bool,
    ) -> Result<Article, StorageError> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET is_read = ? WHERE id = ? RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(is_read)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(article)
    }

    /// Set the starred flag on an article, returning the updated row
    pub async fn set_article_starred(
        &self,
        article_id: i64,
        is_starred: bool,
    ) -> Result<Article, StorageError> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET is_starred = ? WHERE id = ? RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(is_starred)
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(article)
    }

    /// Delete one article
    pub async fn delete_article(&self, article_id: i64) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Unread article count across all of a user's feeds
    pub async fn unread_count(&self, user_id: &str) -> Result<i64, StorageError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM articles a
            JOIN feeds f ON a.feed_id = f.id
            WHERE f.user_id = ? AND a.is_read = 0
        "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Total/read/starred article counts across all of a user's feeds.
    /// `unread` is derived, not stored.
    pub async fn aggregate_article_counts(
        &self,
        user_id: &str,
    ) -> Result<ArticleCounts, StorageError> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN a.is_read = 1 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN a.is_starred = 1 THEN 1 ELSE 0 END), 0)
            FROM articles a
            JOIN feeds f ON a.feed_id = f.id
            WHERE f.user_id = ?
        "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let (total, read, starred) = row;
        Ok(ArticleCounts {
            total,
            read,
            starred,
            unread: total - read,
        })
    }
}
