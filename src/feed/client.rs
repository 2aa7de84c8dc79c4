use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::storage::FeedMetadata;

/// Response bodies above this size are rejected to prevent memory exhaustion
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving and parsing one remote document.
///
/// These never escape the feed fetcher as failures — it converts them into
/// a failed outcome so one bad feed cannot abort a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One raw entry as the source document presented it.
///
/// Feed dialects overlap loosely: an RSS 2.0 item, an Atom entry, and a
/// media-extended item each fill a different subset of these slots. The
/// normalizer resolves them into one canonical record via an ordered
/// fallback chain; nothing downstream probes these fields directly.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    /// Native identifier (RSS guid / Atom id)
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    /// Full encoded body (content:encoded / Atom content)
    pub content_encoded: Option<String>,
    /// Inline content, when the dialect carries it separately
    pub content: Option<String>,
    /// Plain-text snippet, when the dialect carries one
    pub snippet: Option<String>,
    /// Short summary field
    pub summary: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    pub enclosure_length: Option<i64>,
    pub media_content_urls: Vec<String>,
    pub media_thumbnail_url: Option<String>,
    /// Native publish timestamp
    pub pub_date: Option<DateTime<Utc>>,
    /// ISO-formatted alternative timestamp (RFC 3339)
    pub iso_date: Option<String>,
}

/// A parsed remote document: feed-level metadata plus raw entries in
/// source order.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub meta: FeedMetadata,
    pub entries: Vec<RawEntry>,
}

/// Remote-feed collaborator: retrieve and parse one feed document.
///
/// Injected into the fetcher so tests can substitute a scripted fake for
/// the HTTP implementation.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedDocument, FetchError>;
}

/// HTTP implementation of [`FeedSource`] backed by reqwest and feed-rs
#[derive(Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl FeedSource for HttpFeedSource {
    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedDocument, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_FEED_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let feed = feed_rs::parser::parse(&bytes[..])
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(map_document(feed))
    }
}

/// Read a response body incrementally, aborting as soon as the running total
/// exceeds `limit`. A chunked response without a Content-Length header is
/// never buffered past the cap.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Flatten a feed-rs model into the loose document shape the pipeline
/// consumes. Entries keep source order.
fn map_document(feed: feed_rs::model::Feed) -> ParsedDocument {
    let meta = FeedMetadata {
        title: feed.title.map(|t| t.content),
        description: feed.description.map(|t| t.content),
        link: feed.links.first().map(|l| l.href.clone()),
        language: feed.language,
        copyright: feed.rights.map(|t| t.content),
        generator: feed.generator.map(|g| g.content),
        image_url: feed
            .logo
            .map(|i| i.uri)
            .or_else(|| feed.icon.map(|i| i.uri)),
        last_build_date: feed.updated.map(|d| d.timestamp()),
    };

    let entries = feed.entries.into_iter().map(map_entry).collect();

    ParsedDocument { meta, entries }
}

fn map_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let guid = {
        let trimmed = entry.id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };

    // feed-rs folds RSS <enclosure> and media:content into MediaObjects.
    // The first content slot becomes the enclosure; the rest keep their
    // media:content role.
    let mut enclosure_url = None;
    let mut enclosure_type = None;
    let mut enclosure_length = None;
    let mut media_content_urls = Vec::new();
    let mut media_thumbnail_url = None;
    for media in &entry.media {
        for content in &media.content {
            let Some(url) = content.url.as_ref().map(|u| u.to_string()) else {
                continue;
            };
            if enclosure_url.is_none() {
                enclosure_url = Some(url);
                enclosure_type = content.content_type.as_ref().map(|ct| ct.to_string());
                enclosure_length = content.size.map(|s| s as i64);
            } else {
                media_content_urls.push(url);
            }
        }
        if media_thumbnail_url.is_none() {
            media_thumbnail_url = media.thumbnails.first().map(|t| t.image.uri.clone());
        }
    }

    RawEntry {
        guid,
        link: entry.links.first().map(|l| l.href.clone()),
        title: entry.title.map(|t| t.content),
        content_encoded: entry.content.and_then(|c| c.body),
        content: None,
        snippet: None,
        summary: entry.summary.map(|t| t.content),
        author: entry.authors.first().map(|p| p.name.clone()),
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
        enclosure_url,
        enclosure_type,
        enclosure_length,
        media_content_urls,
        media_thumbnail_url,
        pub_date: entry.published,
        iso_date: entry.updated.map(|d| d.to_rfc3339()),
    }
}
