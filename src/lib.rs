//! rill — feed ingestion and aggregation pipeline.
//!
//! The crate is layered bottom-up:
//!
//! - [`storage`] - SQLite persistence: feeds, articles, daily counters,
//!   email logs
//! - [`feed`] - the ingestion pipeline: HTTP retrieval, normalization,
//!   deduplication, per-user batch orchestration
//! - [`stats`] - daily counters and rolled-up totals over the stored data
//! - [`email`] - article sharing through an injected sender
//! - [`config`] - optional TOML configuration
//!
//! External collaborators (the remote feed endpoint, the email transport)
//! are traits ([`feed::FeedSource`], [`email::EmailSender`]) so the
//! pipeline can be driven end to end against scripted fakes.

pub mod config;
pub mod email;
pub mod feed;
pub mod stats;
pub mod storage;
