//! Article ingestion from arbitrary URLs.
//!
//! - [`url_filter`] - Pure pre-fetch check (scheme, social domains, image files)
//! - [`scrape`] - HTML heuristics for title, summary, date and image
//! - [`extractor`] - Fetches, gates on quality and stores each page

pub mod extractor;
pub mod scrape;
pub mod url_filter;

pub use extractor::UrlContentExtractor;
pub use scrape::{scrape_article, ScrapedPage};
pub use url_filter::{check_article_url, is_article_url, UrlRejection};
