//! News ingestion from RSS/Atom feeds and arbitrary article URLs.
//!
//! Feeds are registered through a [`feed::FeedCatalog`] (directly or by
//! discovering them on a site), read by [`feed::FeedReader`], and stored
//! deduplicated by link in a SQLite [`storage::Database`]. Arbitrary URLs go
//! through [`content::UrlContentExtractor`], which scrapes each page with a
//! chain of HTML heuristics.

pub mod config;
pub mod content;
pub mod feed;
pub mod http;
pub mod news;
pub mod outcome;
pub mod storage;
pub mod util;
