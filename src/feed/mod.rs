//! Feed sources: discovery, registration and reading.
//!
//! - [`discovery`] - Two-level crawl of a site for feed endpoints
//! - [`catalog`] - Validates and registers sources, keeps the working set
//! - [`reader`] - Pulls one feed, normalizes and stores its entries
//! - [`parser`] - RSS/Atom parsing with `feed-rs`
//!
//! # Example
//!
//! ```ignore
//! let mut catalog = FeedCatalog::new(db, client);
//! catalog.add_feed(&FeedRegistration::feed("Daily", "https://news.example/rss")).await;
//! for (name, result) in catalog.read_all().await {
//!     println!("{name}: {result:?}");
//! }
//! ```

pub mod catalog;
pub mod discovery;
pub mod parser;
pub mod reader;

pub use catalog::{Admission, CatalogSettings, FeedCatalog, FeedRegistration};
pub use discovery::{DiscoveryError, FeedLinkExtractor};
pub use parser::{parse_feed, FeedEntry};
pub use reader::{FeedReader, FeedSnapshot, FeedSource, ReaderSettings};
