use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StorageError {
    /// An article with the same guid already exists (unique constraint race)
    #[error("An article with this guid already exists")]
    DuplicateKey,

    /// The requested row does not exist
    #[error("Not found")]
    NotFound,

    /// The feed URL is already subscribed by a different user
    #[error("This feed URL is already subscribed by another user")]
    FeedUrlTaken,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    /// Map a sqlx error, detecting unique-constraint violations.
    ///
    /// SQLite reports guid collisions as SQLITE_CONSTRAINT_UNIQUE; callers
    /// on the insert path treat [`StorageError::DuplicateKey`] as a soft
    /// failure (log-and-skip) rather than aborting the batch.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StorageError::DuplicateKey;
            }
        }
        StorageError::Other(err)
    }
}

// ============================================================================
// Feed Types
// ============================================================================

/// A subscribed remote syndication source.
///
/// Display metadata (title through `last_build_date`) is overwritten on every
/// successful fetch, with fresh values falling back to the previously stored
/// ones. Health fields (`last_fetched_at`, `last_fetch_error`) are stamped on
/// every fetch attempt, success or failure.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub image_url: Option<String>,
    pub last_build_date: Option<i64>,
    pub last_fetched_at: Option<i64>,
    pub last_fetch_error: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Feed-level metadata extracted from a parsed remote document.
///
/// All fields are optional: an absent value means the document did not carry
/// that field, and the previously stored value is retained on update
/// ("fresh overrides stale, never blanks a previously known field").
#[derive(Debug, Clone, Default)]
pub struct FeedMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub image_url: Option<String>,
    pub last_build_date: Option<i64>,
}

// ============================================================================
// Article Types
// ============================================================================

/// One ingested entry from a feed.
///
/// `guid` is the global dedup identity: at most one article per guid is ever
/// inserted, across all feeds. `pub_date` is None when the source entry
/// carried no usable timestamp — chronologically unknown, sorted last.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    /// JSON array of category strings, None when the entry had none
    pub categories: Option<String>,
    pub image_url: Option<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,
    pub pub_date: Option<i64>,
    pub is_read: bool,
    pub is_starred: bool,
    pub created_at: i64,
}

/// A canonical article record produced by the normalizer, ready for insert.
///
/// New articles always start unread and unstarred; those flags live on the
/// stored [`Article`] only.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub feed_id: i64,
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub categories: Option<String>,
    pub image_url: Option<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,
    pub pub_date: Option<i64>,
}

// ============================================================================
// Stats Types
// ============================================================================

/// Per-user, per-calendar-day additive counters.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyStat {
    pub user_id: String,
    /// Calendar day in `YYYY-MM-DD` (UTC)
    pub date: String,
    pub articles_read: i64,
    pub articles_starred: i64,
    pub emails_sent: i64,
}

impl DailyStat {
    /// Zero-valued placeholder for a day with no recorded activity
    pub fn empty(user_id: &str, date: String) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            articles_read: 0,
            articles_starred: 0,
            emails_sent: 0,
        }
    }
}

/// Non-negative increments applied to a user's daily counters.
///
/// Increments are additive and commutative: repeated calls within the same
/// day accumulate, never overwrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatDeltas {
    pub articles_read: u32,
    pub articles_starred: u32,
    pub emails_sent: u32,
}

impl StatDeltas {
    pub fn read(n: u32) -> Self {
        Self {
            articles_read: n,
            ..Self::default()
        }
    }

    pub fn starred(n: u32) -> Self {
        Self {
            articles_starred: n,
            ..Self::default()
        }
    }

    pub fn emails(n: u32) -> Self {
        Self {
            emails_sent: n,
            ..Self::default()
        }
    }
}

/// Aggregate article counts across all of a user's feeds.
///
/// `unread` is derived (`total - read`), never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleCounts {
    pub total: i64,
    pub read: i64,
    pub starred: i64,
    pub unread: i64,
}

/// Aggregate email counts across all of a user's email log entries.
///
/// `failed` is derived (`total - successful`), never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailCounts {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

/// Rolled-up overall statistics for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverallStats {
    pub articles: ArticleCounts,
    pub emails: EmailCounts,
}

// ============================================================================
// Email Log Types
// ============================================================================

/// Append-only record of one outbound share attempt
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailLog {
    pub id: i64,
    pub user_id: String,
    pub article_id: Option<i64>,
    pub recipient: String,
    pub article_title: String,
    pub article_link: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: i64,
}

/// Email log row to append; one per send attempt, never mutated
#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub user_id: String,
    pub article_id: Option<i64>,
    pub recipient: String,
    pub article_title: String,
    pub article_link: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}
