use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Migration` if the schema could not be created,
    /// `StorageError::Other` for connection-level errors.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY. Handles transient contention between
        // a running fetch batch and read/star mutations.
        // foreign_keys is per-connection in SQLite, so it has to be part of
        // the connect options — every pooled connection needs it for the
        // article cascade to hold.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);
        // SQLite is single-writer; 5 connections covers the sequential fetch
        // worker plus concurrent read-side queries.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;
        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op. If any step fails the transaction rolls back,
    /// leaving the previous schema intact.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                link TEXT,
                language TEXT,
                copyright TEXT,
                generator TEXT,
                image_url TEXT,
                last_build_date INTEGER,
                last_fetched_at INTEGER,
                last_fetch_error TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // guid is UNIQUE across all feeds: the dedup contract is global,
        // enforced at insert time.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                guid TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                link TEXT,
                description TEXT,
                content TEXT,
                author TEXT,
                categories TEXT,
                image_url TEXT,
                enclosure_url TEXT,
                enclosure_type TEXT,
                enclosure_length INTEGER,
                pub_date INTEGER,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_starred INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_feeds_user ON feeds(user_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_feed ON articles(feed_id)")
            .execute(&mut *tx)
            .await?;
        // Composite index for the per-feed listing: filters by feed_id,
        // sorts by pub_date DESC with NULLs last
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_feed_pub ON articles(feed_id, pub_date DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_read ON articles(is_read)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_starred ON articles(is_starred)")
            .execute(&mut *tx)
            .await?;

        // One row per (user, calendar day); counters only ever increment
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_stats (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                articles_read INTEGER NOT NULL DEFAULT 0,
                articles_starred INTEGER NOT NULL DEFAULT 0,
                emails_sent INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                UNIQUE(user_id, date)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Append-only; article_id is kept nullable so deleting an article
        // does not erase the share history
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS email_logs (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                article_id INTEGER REFERENCES articles(id) ON DELETE SET NULL,
                recipient TEXT NOT NULL,
                article_title TEXT NOT NULL,
                article_link TEXT,
                success INTEGER NOT NULL,
                error_message TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_email_logs_user ON email_logs(user_id, created_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
