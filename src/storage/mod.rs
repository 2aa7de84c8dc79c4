mod articles;
mod feeds;
mod schema;
mod stats;
mod types;

pub use schema::Database;
pub use types::{
    Article, ArticleCounts, DailyStat, EmailCounts, EmailLog, Feed, FeedMetadata, NewArticle,
    NewEmailLog, OverallStats, StatDeltas, StorageError,
};
