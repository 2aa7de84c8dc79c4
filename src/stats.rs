//! Stats aggregation: per-user daily counters and rolled-up totals.
//!
//! Counters are a secondary, eventually-consistent projection of read/star/
//! email events. The primary action (the article mutation, the email log)
//! always lands first; the counter increment that follows is best-effort —
//! a failure there is logged and swallowed, never surfaced as a failure of
//! the user-visible action.
//!
//! "Today" is resolved in UTC. The upstream behavior used the process-local
//! wall clock, which makes the midnight boundary host-dependent; UTC keeps
//! it deterministic.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};

use crate::storage::{Article, DailyStat, Database, OverallStats, StatDeltas, StorageError};

/// The current calendar date in UTC, as `YYYY-MM-DD`
pub fn today_utc() -> String {
    format_date(Utc::now().date_naive())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Additively apply deltas to the caller's counters for today.
/// Commutative across repeated calls within the same day.
pub async fn increment(
    db: &Database,
    user_id: &str,
    deltas: &StatDeltas,
) -> Result<DailyStat, StorageError> {
    db.upsert_daily_stat(user_id, &today_utc(), deltas).await
}

/// The last `days` calendar days ending today inclusive, in chronological
/// order. Days without recorded activity are synthesized as zero-valued
/// placeholders, so the output is always dense, ordered, and exactly
/// `days` long — suitable for direct charting.
pub async fn daily_window(
    db: &Database,
    user_id: &str,
    days: u32,
) -> Result<Vec<DailyStat>, StorageError> {
    if days == 0 {
        return Ok(Vec::new());
    }

    let today = Utc::now().date_naive();
    let from = today
        .checked_sub_days(Days::new(u64::from(days) - 1))
        .unwrap_or(today);

    let rows = db
        .query_daily_stats_range(user_id, &format_date(from), &format_date(today))
        .await?;
    let mut by_date: HashMap<String, DailyStat> =
        rows.into_iter().map(|s| (s.date.clone(), s)).collect();

    let mut window = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let date = format_date(from + Days::new(u64::from(offset)));
        let stat = by_date
            .remove(&date)
            .unwrap_or_else(|| DailyStat::empty(user_id, date));
        window.push(stat);
    }

    Ok(window)
}

/// Rolled-up totals for one user: article counts across all their feeds and
/// email counts across their share log. Unread and failed are derived.
pub async fn overall_stats(db: &Database, user_id: &str) -> Result<OverallStats, StorageError> {
    let articles = db.aggregate_article_counts(user_id).await?;
    let emails = db.aggregate_email_counts(user_id).await?;
    Ok(OverallStats { articles, emails })
}

/// Mark an article read and record the event.
///
/// The state mutation is the primary action; the counter increment that
/// follows is best-effort. Every mark-read event counts, including
/// re-reading an already-read article — the counter tracks events, not
/// distinct articles.
pub async fn record_article_read(
    db: &Database,
    user_id: &str,
    article_id: i64,
) -> Result<Article, StorageError> {
    let updated = db.mark_article_read(article_id, true).await?;

    swallow_stats_failure(
        increment(db, user_id, &StatDeltas::read(1)).await,
        user_id,
        "articles_read",
    );

    Ok(updated)
}

/// Star or unstar an article and record the event.
///
/// Every starring event counts; unstarring mutates the article but never
/// decrements a counter (counters are monotonic).
pub async fn record_article_starred(
    db: &Database,
    user_id: &str,
    article_id: i64,
    starred: bool,
) -> Result<Article, StorageError> {
    let updated = db.set_article_starred(article_id, starred).await?;

    if starred {
        swallow_stats_failure(
            increment(db, user_id, &StatDeltas::starred(1)).await,
            user_id,
            "articles_starred",
        );
    }

    Ok(updated)
}

/// Fire-and-forget shape for the secondary stats projection: a failed
/// increment is logged and discarded, keeping the distinction between
/// primary-action failures and projection failures visible at call sites.
pub(crate) fn swallow_stats_failure(
    result: Result<DailyStat, StorageError>,
    user_id: &str,
    counter: &str,
) {
    if let Err(e) = result {
        tracing::warn!(user_id = %user_id, counter = %counter, error = %e, "Stats increment failed");
    }
}
