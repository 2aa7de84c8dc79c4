use chrono::DateTime;

use super::client::RawEntry;
use crate::storage::NewArticle;

/// Convert one raw entry into a canonical article record for the given feed.
///
/// Pure mapping, no I/O. Each canonical field is resolved through an ordered
/// fallback chain — first present wins:
///
/// - `guid` ← native identifier, else link, else the entry is skipped
/// - `content` ← full encoded body, else inline content, else snippet
/// - `description` ← summary, else snippet
/// - `image_url` ← enclosure URL, else first media content, else thumbnail
/// - `pub_date` ← native timestamp, else the ISO alternative, else absent
///
/// Returns `None` when the entry carries neither a native identifier nor a
/// link: without an identity it cannot be deduplicated or displayed, so it
/// is discarded rather than stored. `pub_date` is never defaulted to "now" —
/// absent means chronologically unknown.
pub fn normalize(feed_id: i64, entry: &RawEntry) -> Option<NewArticle> {
    let guid = entry
        .guid
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .or_else(|| {
            entry
                .link
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
        })?
        .to_string();

    let content = entry
        .content_encoded
        .clone()
        .or_else(|| entry.content.clone())
        .or_else(|| entry.snippet.clone());

    let description = entry.summary.clone().or_else(|| entry.snippet.clone());

    let image_url = entry
        .enclosure_url
        .clone()
        .or_else(|| entry.media_content_urls.first().cloned())
        .or_else(|| entry.media_thumbnail_url.clone());

    let pub_date = entry.pub_date.map(|d| d.timestamp()).or_else(|| {
        entry
            .iso_date
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.timestamp())
    });

    let categories = if entry.categories.is_empty() {
        None
    } else {
        // Serialization of a Vec<String> cannot fail
        serde_json::to_string(&entry.categories).ok()
    };

    Some(NewArticle {
        feed_id,
        guid,
        title: entry
            .title
            .clone()
            .unwrap_or_else(|| "Untitled".to_string()),
        link: entry.link.clone(),
        description,
        content,
        author: entry.author.clone(),
        categories,
        image_url,
        enclosure_url: entry.enclosure_url.clone(),
        enclosure_type: entry.enclosure_type.clone(),
        enclosure_length: entry.enclosure_length,
        pub_date,
    })
}
