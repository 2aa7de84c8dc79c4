//! End-to-end ingestion tests: a mock HTTP server serving real RSS, fetched
//! through the reqwest/feed-rs client, normalized, deduplicated, and stored.
//!
//! Each test creates its own in-memory SQLite database for isolation.

use std::time::Duration;

use rill::feed::{fetch_feed, refresh_user, HttpFeedSource};
use rill::storage::Database;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
    <title>Example Blog</title>
    <description>Posts about things</description>
    <link>https://blog.example.com</link>
    <item>
        <guid>post-1</guid>
        <title>Hello</title>
        <link>https://blog.example.com/hello</link>
        <description>A greeting</description>
        <content:encoded><![CDATA[<p>Hello, world</p>]]></content:encoded>
        <pubDate>Mon, 01 Jan 2024 08:00:00 GMT</pubDate>
    </item>
    <item>
        <guid>post-2</guid>
        <title>Goodbye</title>
        <link>https://blog.example.com/goodbye</link>
        <pubDate>Tue, 02 Jan 2024 08:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn source() -> HttpFeedSource {
    HttpFeedSource::new(reqwest::Client::new(), Duration::from_secs(30))
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_stores_normalized_articles() {
    let server = MockServer::start().await;
    serve(&server, "/rss", BLOG_RSS).await;

    let db = test_db().await;
    let feed_id = db
        .insert_feed("user-1", &format!("{}/rss", server.uri()), "placeholder")
        .await
        .unwrap();

    let outcome = fetch_feed(&db, &source(), feed_id).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.article_count, 2);

    let articles = db.list_articles_for_feed(feed_id, 50, 0).await.unwrap();
    assert_eq!(articles.len(), 2);

    // Newest first: post-2 was published a day later
    assert_eq!(articles[0].guid, "post-2");
    assert_eq!(articles[1].guid, "post-1");

    let hello = &articles[1];
    assert_eq!(hello.title, "Hello");
    assert_eq!(hello.link.as_deref(), Some("https://blog.example.com/hello"));
    assert_eq!(hello.description.as_deref(), Some("A greeting"));
    assert_eq!(hello.content.as_deref(), Some("<p>Hello, world</p>"));
    assert!(hello.pub_date.is_some());
    assert!(!hello.is_read);

    // Remote metadata replaced the placeholder title, health fields stamped
    let feed = db.get_feed(feed_id).await.unwrap().unwrap();
    assert_eq!(feed.title, "Example Blog");
    assert_eq!(feed.description.as_deref(), Some("Posts about things"));
    assert!(feed.last_fetched_at.is_some());
    assert!(feed.last_fetch_error.is_none());
}

#[tokio::test]
async fn test_refetch_inserts_nothing_and_keeps_state() {
    let server = MockServer::start().await;
    serve(&server, "/rss", BLOG_RSS).await;

    let db = test_db().await;
    let feed_id = db
        .insert_feed("user-1", &format!("{}/rss", server.uri()), "placeholder")
        .await
        .unwrap();

    fetch_feed(&db, &source(), feed_id).await.unwrap();
    let articles = db.list_articles_for_feed(feed_id, 50, 0).await.unwrap();
    db.mark_article_read(articles[0].id, true).await.unwrap();

    let outcome = fetch_feed(&db, &source(), feed_id).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.article_count, 0, "unchanged document adds nothing");

    // First-seen wins: the stored row and its read flag survive the refetch
    let after = db.list_articles_for_feed(feed_id, 50, 0).await.unwrap();
    assert_eq!(after.len(), 2);
    assert!(after[0].is_read);
}

#[tokio::test]
async fn test_server_failure_stamps_feed_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = test_db().await;
    let feed_id = db
        .insert_feed("user-1", &format!("{}/rss", server.uri()), "Broken")
        .await
        .unwrap();

    let outcome = fetch_feed(&db, &source(), feed_id).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("500"));

    let feed = db.get_feed(feed_id).await.unwrap().unwrap();
    assert!(feed.last_fetched_at.is_some());
    assert!(feed.last_fetch_error.is_some());
    // The stored title is untouched by a failed fetch
    assert_eq!(feed.title, "Broken");
}

#[tokio::test]
async fn test_batch_survives_one_broken_feed() {
    let server = MockServer::start().await;
    serve(&server, "/good", BLOG_RSS).await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<not a feed"))
        .mount(&server)
        .await;

    let db = test_db().await;
    let good_id = db
        .insert_feed("user-1", &format!("{}/good", server.uri()), "Good")
        .await
        .unwrap();
    let bad_id = db
        .insert_feed("user-1", &format!("{}/bad", server.uri()), "Bad")
        .await
        .unwrap();

    let outcomes = refresh_user(&db, &source(), "user-1").await;
    assert_eq!(outcomes.len(), 2);

    // Enumeration order is subscription order
    assert_eq!(outcomes[0].feed_id, good_id);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].article_count, 2);

    assert_eq!(outcomes[1].feed_id, bad_id);
    assert!(!outcomes[1].success);

    // The broken feed did not prevent the good feed's articles from landing
    assert_eq!(db.list_articles_for_feed(good_id, 50, 0).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_guid_across_feeds_stored_once() {
    let server = MockServer::start().await;
    serve(&server, "/a", BLOG_RSS).await;
    serve(&server, "/b", BLOG_RSS).await;

    let db = test_db().await;
    let first = db
        .insert_feed("user-1", &format!("{}/a", server.uri()), "A")
        .await
        .unwrap();
    let second = db
        .insert_feed("user-1", &format!("{}/b", server.uri()), "B")
        .await
        .unwrap();

    let outcomes = refresh_user(&db, &source(), "user-1").await;
    assert_eq!(outcomes[0].article_count, 2);
    assert_eq!(outcomes[1].article_count, 0, "mirror feed adds nothing");

    // Deduplication is global: the articles belong to the first feed seen
    assert_eq!(db.list_articles_for_feed(first, 50, 0).await.unwrap().len(), 2);
    assert!(db.list_articles_for_feed(second, 50, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paused_feed_is_not_fetched() {
    let server = MockServer::start().await;
    serve(&server, "/rss", BLOG_RSS).await;

    let db = test_db().await;
    let feed_id = db
        .insert_feed("user-1", &format!("{}/rss", server.uri()), "Paused")
        .await
        .unwrap();
    db.set_feed_active(feed_id, false).await.unwrap();

    let outcomes = refresh_user(&db, &source(), "user-1").await;
    assert!(outcomes.is_empty());
    assert!(db.list_articles_for_feed(feed_id, 50, 0).await.unwrap().is_empty());
}
