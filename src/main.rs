use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use rill::config::Config;
use rill::feed::{fetch_feed, refresh_user, HttpFeedSource};
use rill::stats::{daily_window, overall_stats};
use rill::storage::Database;

/// Get the config directory path (~/.config/rill/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("rill"))
}

#[derive(Parser, Debug)]
#[command(name = "rill", about = "Feed ingestion engine with per-user reading statistics")]
struct Args {
    /// Database path (defaults to ~/.config/rill/rill.db)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe a user to a feed URL
    Add {
        user: String,
        url: String,
        /// Placeholder title until the first fetch fills in feed metadata
        #[arg(long)]
        title: Option<String>,
    },
    /// Fetch one feed by id
    Fetch { feed: i64 },
    /// Fetch all of a user's active feeds
    FetchAll { user: String },
    /// List a user's feeds with health status
    List { user: String },
    /// Show a user's daily activity and overall totals
    Stats {
        user: String,
        /// Window length in days (defaults to the configured value)
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    let config = Config::load(&config_dir.join("config.toml"))?;

    let db_path = args.db.unwrap_or_else(|| config_dir.join("rill.db"));
    let db = Database::open(&db_path.to_string_lossy())
        .await
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")?;
    let source = HttpFeedSource::new(client, Duration::from_secs(config.fetch_timeout_secs));

    match args.command {
        Command::Add { user, url, title } => {
            url::Url::parse(&url).with_context(|| format!("Invalid feed URL: {url}"))?;
            let title = title.unwrap_or_else(|| url.clone());
            let feed_id = db.insert_feed(&user, &url, &title).await?;
            println!("Subscribed feed {} ({})", feed_id, url);
        }
        Command::Fetch { feed } => {
            let outcome = fetch_feed(&db, &source, feed).await?;
            print_outcome(&outcome);
        }
        Command::FetchAll { user } => {
            let outcomes = refresh_user(&db, &source, &user).await;
            if outcomes.is_empty() {
                println!("No active feeds for {}", user);
            }
            for outcome in &outcomes {
                print_outcome(outcome);
            }
            let new_total: usize = outcomes.iter().map(|o| o.article_count).sum();
            let failures = outcomes.iter().filter(|o| !o.success).count();
            println!("{} feeds, {} new articles, {} failures", outcomes.len(), new_total, failures);
        }
        Command::List { user } => {
            let feeds = db.list_feeds_by_user(&user).await?;
            if feeds.is_empty() {
                println!("No feeds for {}", user);
            }
            for feed in feeds {
                let status = match (&feed.last_fetch_error, feed.is_active) {
                    (_, false) => "paused".to_string(),
                    (Some(e), _) => format!("error: {}", e),
                    (None, _) => "ok".to_string(),
                };
                println!("{:>4}  {}  {}  [{}]", feed.id, feed.title, feed.url, status);
            }
        }
        Command::Stats { user, days } => {
            let days = days.unwrap_or(config.stats_window_days);
            let window = daily_window(&db, &user, days).await?;
            for day in &window {
                println!(
                    "{}  read {:>3}  starred {:>3}  emailed {:>3}",
                    day.date, day.articles_read, day.articles_starred, day.emails_sent
                );
            }
            let overall = overall_stats(&db, &user).await?;
            println!(
                "total: {} articles ({} read, {} unread, {} starred), {} emails ({} sent, {} failed)",
                overall.articles.total,
                overall.articles.read,
                overall.articles.unread,
                overall.articles.starred,
                overall.emails.total,
                overall.emails.successful,
                overall.emails.failed,
            );
        }
    }

    Ok(())
}

fn print_outcome(outcome: &rill::feed::FetchOutcome) {
    if outcome.success {
        println!("feed {}: {} new articles", outcome.feed_id, outcome.article_count);
    } else {
        println!(
            "feed {}: failed ({})",
            outcome.feed_id,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}
