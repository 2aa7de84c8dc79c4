use super::client::FeedSource;
use super::normalizer::normalize;
use crate::storage::{Database, StorageError};

/// The structured result of one feed fetch attempt.
///
/// Entries that fail normalization or are duplicates are silently excluded
/// from `article_count` — they are not errors. A failed fetch carries the
/// failure description and a zero count.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub feed_id: i64,
    pub success: bool,
    /// Number of new articles inserted by this attempt
    pub article_count: usize,
    pub error: Option<String>,
}

impl FetchOutcome {
    fn succeeded(feed_id: i64, article_count: usize) -> Self {
        Self {
            feed_id,
            success: true,
            article_count,
            error: None,
        }
    }

    fn failed(feed_id: i64, error: String) -> Self {
        Self {
            feed_id,
            success: false,
            article_count: 0,
            error: Some(error),
        }
    }

    fn not_found(feed_id: i64) -> Self {
        Self::failed(feed_id, "Feed not found".to_string())
    }
}

/// Fetch one feed and ingest its entries.
///
/// Steps:
/// 1. Load the feed record; an absent feed yields a failed outcome, not an
///    error — a deleted feed must never abort a batch.
/// 2. Retrieve and parse the remote document. On failure the feed's health
///    fields are stamped (`last_fetched_at` = now, `last_fetch_error` set)
///    and a failed outcome is returned.
/// 3. On success, overwrite the feed's display metadata (fresh overrides
///    stale, absent incoming fields keep the stored value), clear the error
///    and stamp the fetch time.
/// 4. Normalize, deduplicate, and insert every entry in source order.
///
/// Re-running against an unchanged document inserts nothing and leaves
/// existing read/star state untouched (first-seen wins).
///
/// # Errors
///
/// Only persistence failures propagate; network/parse problems are folded
/// into the outcome.
pub async fn fetch_feed(
    db: &Database,
    source: &impl FeedSource,
    feed_id: i64,
) -> Result<FetchOutcome, StorageError> {
    let Some(feed) = db.get_feed(feed_id).await? else {
        tracing::warn!(feed_id = feed_id, "Fetch requested for unknown feed");
        return Ok(FetchOutcome::not_found(feed_id));
    };

    let doc = match source.fetch_and_parse(&feed.url).await {
        Ok(doc) => doc,
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(feed_id = feed_id, url = %feed.url, error = %message, "Feed fetch failed");
            db.record_fetch_failure(feed_id, &message).await?;
            return Ok(FetchOutcome::failed(feed_id, message));
        }
    };

    db.update_feed_metadata(feed_id, &doc.meta).await?;

    let mut inserted = 0usize;
    for entry in &doc.entries {
        // Entries without a native identifier or link carry no identity:
        // skip, don't store
        let Some(article) = normalize(feed_id, entry) else {
            tracing::debug!(feed_id = feed_id, "Skipping entry without guid or link");
            continue;
        };

        if is_duplicate(db, &article.guid).await? {
            continue;
        }

        match db.insert_article(&article).await {
            Ok(_) => inserted += 1,
            // Lost a check-then-insert race with a concurrent fetch; the
            // first insert won, which is the contract
            Err(StorageError::DuplicateKey) => {
                tracing::warn!(feed_id = feed_id, guid = %article.guid, "Skipping duplicate article");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        feed_id = feed_id,
        url = %feed.url,
        inserted = inserted,
        total_entries = doc.entries.len(),
        "Feed refreshed"
    );

    Ok(FetchOutcome::succeeded(feed_id, inserted))
}

/// Dedup check: has an article with this guid been stored before?
/// First-seen wins — a hit means the candidate is dropped, never merged.
async fn is_duplicate(db: &Database, guid: &str) -> Result<bool, StorageError> {
    Ok(db.find_article_by_guid(guid).await?.is_some())
}

/// Fetch all of a user's active feeds, strictly sequentially, in
/// subscription order.
///
/// A failure in one feed's fetch (parse error, feed deleted mid-batch,
/// persistence hiccup) is captured as that feed's outcome and never stops
/// the remaining feeds. The returned outcomes preserve enumeration order.
/// A user with zero feeds — or an error enumerating them — yields an empty
/// list rather than failing the caller.
pub async fn refresh_user(
    db: &Database,
    source: &impl FeedSource,
    user_id: &str,
) -> Vec<FetchOutcome> {
    let feeds = match db.list_active_feeds_by_user(user_id).await {
        Ok(feeds) => feeds,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to enumerate feeds for refresh");
            return Vec::new();
        }
    };

    let mut outcomes = Vec::with_capacity(feeds.len());
    for feed in feeds {
        let outcome = match fetch_feed(db, source, feed.id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(feed_id = feed.id, error = %e, "Persistence failure during fetch");
                FetchOutcome::failed(feed.id, e.to_string())
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}
