use super::schema::Database;
use super::types::{DailyStat, EmailCounts, EmailLog, NewEmailLog, StatDeltas, StorageError};

impl Database {
    // ========================================================================
    // Daily Stat Operations
    // ========================================================================

    /// Load the counter row for one (user, calendar day), if any
    pub async fn get_daily_stat(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyStat>, StorageError> {
        let stat = sqlx::query_as::<_, DailyStat>(
            "SELECT user_id, date, articles_read, articles_starred, emails_sent \
             FROM daily_stats WHERE user_id = ? AND date = ?",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stat)
    }

    /// Additively apply deltas to the (user, date) counter row, creating it
    /// lazily on the first event of the day. Counters only ever increment —
    /// repeated calls accumulate, never overwrite.
    pub async fn upsert_daily_stat(
        &self,
        user_id: &str,
        date: &str,
        deltas: &StatDeltas,
    ) -> Result<DailyStat, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let stat = sqlx::query_as::<_, DailyStat>(
            r#"
            INSERT INTO daily_stats (user_id, date, articles_read, articles_starred,
                                     emails_sent, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET
                articles_read = articles_read + excluded.articles_read,
                articles_starred = articles_starred + excluded.articles_starred,
                emails_sent = emails_sent + excluded.emails_sent,
                updated_at = excluded.updated_at
            RETURNING user_id, date, articles_read, articles_starred, emails_sent
        "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(deltas.articles_read)
        .bind(deltas.articles_starred)
        .bind(deltas.emails_sent)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(stat)
    }

    /// Counter rows for a user within `[from_date, to_date]` inclusive, in
    /// chronological order. Days without activity have no row here; the
    /// aggregator synthesizes zero placeholders for dense output.
    pub async fn query_daily_stats_range(
        &self,
        user_id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<Vec<DailyStat>, StorageError> {
        let stats = sqlx::query_as::<_, DailyStat>(
            "SELECT user_id, date, articles_read, articles_starred, emails_sent \
             FROM daily_stats \
             WHERE user_id = ? AND date >= ? AND date <= ? \
             ORDER BY date",
        )
        .bind(user_id)
        .bind(from_date)
        .bind(to_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    // ========================================================================
    // Email Log Operations
    // ========================================================================

    /// Append one share attempt to the email log (append-only)
    pub async fn insert_email_log(&self, log: &NewEmailLog) -> Result<EmailLog, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let inserted = sqlx::query_as::<_, EmailLog>(
            r#"
            INSERT INTO email_logs (user_id, article_id, recipient, article_title,
                                    article_link, success, error_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, article_id, recipient, article_title, article_link,
                      success, error_message, created_at
        "#,
        )
        .bind(&log.user_id)
        .bind(log.article_id)
        .bind(&log.recipient)
        .bind(&log.article_title)
        .bind(&log.article_link)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    /// A user's share history, newest first
    pub async fn list_email_logs(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<EmailLog>, StorageError> {
        let logs = sqlx::query_as::<_, EmailLog>(
            "SELECT id, user_id, article_id, recipient, article_title, article_link, \
                    success, error_message, created_at \
             FROM email_logs WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// Total/successful email counts for a user. `failed` is derived.
    pub async fn aggregate_email_counts(
        &self,
        user_id: &str,
    ) -> Result<EmailCounts, StorageError> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), 0)
            FROM email_logs
            WHERE user_id = ?
        "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let (total, successful) = row;
        Ok(EmailCounts {
            total,
            successful,
            failed: total - successful,
        })
    }
}
