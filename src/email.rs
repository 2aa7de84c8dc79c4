//! Article sharing over email.
//!
//! The actual transport is a consumed capability: callers inject an
//! [`EmailSender`] (an SMTP client, an HTTP relay, a fake in tests). This
//! module owns what happens around the send — rendering the share body,
//! appending the append-only email log, and bumping the daily counter on
//! success.

use chrono::{TimeZone, Utc};

use crate::stats::{increment, swallow_stats_failure};
use crate::storage::{Article, Database, EmailLog, NewEmailLog, StatDeltas, StorageError};

/// Outbound email capability. Returns whether the send succeeded; transport
/// errors are the sender's own concern and surface only as `false`.
#[allow(async_fn_in_trait)]
pub trait EmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> bool;
}

/// Share an article to a recipient address.
///
/// Every attempt is logged exactly once, success or failure — the log is the
/// audit trail, not a side effect of success. The `emails_sent` counter is
/// bumped only on success, best-effort. Returns whether the send succeeded.
pub async fn share_article(
    db: &Database,
    sender: &impl EmailSender,
    user_id: &str,
    article: &Article,
    to: &str,
) -> Result<bool, StorageError> {
    let subject = format!("[rill] {}", article.title);
    let html = render_share_email(article);
    let success = sender.send(to, &subject, &html).await;

    if !success {
        tracing::warn!(user_id = %user_id, recipient = %to, article_id = article.id, "Share email failed to send");
    }

    db.insert_email_log(&NewEmailLog {
        user_id: user_id.to_string(),
        article_id: Some(article.id),
        recipient: to.to_string(),
        article_title: article.title.clone(),
        article_link: article.link.clone(),
        success,
        error_message: (!success).then(|| "send failed".to_string()),
    })
    .await?;

    if success {
        swallow_stats_failure(
            increment(db, user_id, &StatDeltas::emails(1)).await,
            user_id,
            "emails_sent",
        );
    }

    Ok(success)
}

/// A user's share history, newest first
pub async fn email_history(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<EmailLog>, StorageError> {
    db.list_email_logs(user_id, limit).await
}

/// Render the share body. Self-contained HTML: title, byline, summary,
/// and a link to the original.
fn render_share_email(article: &Article) -> String {
    let byline = article
        .author
        .as_deref()
        .map(|a| format!("<p class=\"meta\">By {}</p>", a))
        .unwrap_or_default();
    let published = article
        .pub_date
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|d| format!("<p class=\"meta\">Published {}</p>", d.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();
    let description = article
        .description
        .as_deref()
        .map(|d| format!("<blockquote>{}</blockquote>", d))
        .unwrap_or_default();
    let link = article
        .link
        .as_deref()
        .map(|l| format!("<p><a href=\"{}\">Read the original &rarr;</a></p>", l))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html><body>\n\
         <h1>{title}</h1>\n{byline}{published}{description}{link}\
         <hr><p><small>Shared via rill</small></p>\n\
         </body></html>",
        title = article.title,
    )
}
