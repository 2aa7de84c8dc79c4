//! Feed ingestion pipeline: retrieval, normalization, deduplication.
//!
//! The pipeline is layered leaf-first:
//!
//! - [`client`] - the remote-feed collaborator: [`FeedSource`] plus the
//!   reqwest/feed-rs HTTP implementation producing loosely-shaped entries
//! - [`normalizer`] - pure mapping from a raw entry to a canonical article
//!   record via an ordered fallback chain
//! - [`fetcher`] - one-feed fetch with health bookkeeping, and the
//!   sequential per-user batch orchestrator
//!
//! Collaborators are injected: the fetcher takes its [`FeedSource`] and
//! `Database` as parameters, so tests drive it with scripted fakes.

pub mod client;
pub mod fetcher;
pub mod normalizer;

pub use client::{FeedSource, FetchError, HttpFeedSource, ParsedDocument, RawEntry};
pub use fetcher::{fetch_feed, refresh_user, FetchOutcome};
pub use normalizer::normalize;
