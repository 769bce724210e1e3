use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use newsfeed::config::Config;
use newsfeed::content::UrlContentExtractor;
use newsfeed::feed::{FeedCatalog, FeedLinkExtractor, FeedRegistration};
use newsfeed::http::build_client;
use newsfeed::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/newsfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "newsfeed", about = "Ingest news from RSS/Atom feeds and article URLs")]
struct Args {
    /// Config file (default: ~/.config/newsfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database, overriding the config file
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a feed by URL, or discover and register the feeds of a site
    AddFeed {
        name: String,
        #[arg(long)]
        feed_url: Option<String>,
        #[arg(long)]
        site_url: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        leaning: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Read every source listed in the config file
    Read,
    /// Print a random stored or freshly read article of one feed
    Random {
        name: String,
        feed_url: String,
        /// Read the feed before picking
        #[arg(long)]
        fetch: bool,
    },
    /// Scrape and store arbitrary article URLs
    IngestUrls {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Name prefix for the websites created for each URL
        #[arg(long)]
        prefix: Option<String>,
    },
    /// List the feeds found on a site without registering them
    Discover { site_url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let client = build_client(&config.user_agent).context("Failed to build HTTP client")?;

    if let Command::Discover { site_url } = &args.command {
        let mut extractor = FeedLinkExtractor::new(client, site_url.clone())
            .with_timeout(config.catalog_settings().discovery_timeout);
        extractor.extract_rss_urls().await;
        println!("{}", extractor.to_json()?);
        return Ok(());
    }

    let db_path = match (&args.db, &config.database_path) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => config_dir.join(path),
        (None, None) => config_dir.join("news.db"),
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            eprintln!("Error: the database is locked by another process. Please try again.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let mut catalog = FeedCatalog::new(db.clone(), client.clone()).with_settings(config.catalog_settings());

    match args.command {
        Command::AddFeed {
            name,
            feed_url,
            site_url,
            category,
            language,
            leaning,
            country,
        } => {
            let registration = FeedRegistration {
                name,
                site_url,
                feed_url,
                category,
                language,
                leaning,
                country,
            };
            let admissions = catalog.add_feed(&registration).await;
            println!("{}", serde_json::to_string_pretty(&admissions)?);
        }
        Command::Read => {
            if config.sources.is_empty() {
                eprintln!("No sources configured in {}", config_path.display());
                return Ok(());
            }
            for registration in &config.sources {
                catalog.add_feed(registration).await;
            }
            for (name, result) in catalog.read_all().await {
                match result {
                    Ok(stats) => println!("{name}: {}", serde_json::to_string(&stats)?),
                    Err(e) => eprintln!("{name}: {e}"),
                }
            }
        }
        Command::Random {
            name,
            feed_url,
            fetch,
        } => {
            catalog
                .add_feed(&FeedRegistration::feed(name, feed_url))
                .await;
            let Some(reader) = catalog.feeds_mut().first_mut() else {
                eprintln!("Feed is not registered and could not be validated");
                std::process::exit(1);
            };
            if fetch {
                reader.read_feed().await.context("Feed run aborted")?;
            }
            println!("{}", reader.random_news().await);
        }
        Command::IngestUrls { urls, prefix } => {
            let mut extractor = UrlContentExtractor::new(db, client, urls)
                .with_prefix(prefix.unwrap_or_else(|| config.website_name_prefix.clone()))
                .with_timeout(config.page_timeout())
                .with_concurrency(config.fetch_concurrency);
            let stats = extractor.process_urls().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Discover { .. } => {}
    }

    Ok(())
}
