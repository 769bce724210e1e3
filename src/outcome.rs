//! Outcome types for ingestion runs.
//!
//! Every item (feed entry or URL) ends in exactly one [`ItemOutcome`]. Runs
//! fold those into [`FeedRunStats`] or [`UrlRunStats`], which are the primary
//! output of a run. Only a missing prerequisite stops a run early, and that is
//! reported as a [`RunAbort`] instead of statistics.

use serde::Serialize;
use thiserror::Error;

use crate::http::FetchError;
use crate::storage::DatabaseError;

/// Why an item could not be ingested.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Why an item was skipped without being an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The page answered with a status other than 200
    BadStatus(u16),
    /// The page is not HTML
    NotHtml(String),
    /// Title shorter than the quality threshold
    TitleTooShort(usize),
    /// Summary shorter than the quality threshold
    SummaryTooShort(usize),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BadStatus(status) => write!(f, "HTTP status {status}"),
            SkipReason::NotHtml(content_type) => write!(f, "not HTML ({content_type:?})"),
            SkipReason::TitleTooShort(len) => write!(f, "title too short ({len} chars)"),
            SkipReason::SummaryTooShort(len) => write!(f, "summary too short ({len} chars)"),
        }
    }
}

/// Result of ingesting one item.
#[derive(Debug)]
pub enum ItemOutcome {
    Processed {
        /// A new article row was written (false on the dedup path)
        inserted: bool,
        /// A new image row was written
        image_added: bool,
    },
    Skipped(SkipReason),
    Failed(IngestError),
}

/// A run that could not start.
#[derive(Debug, Error)]
pub enum RunAbort {
    #[error("website {name} with feed {feed_url} is not registered")]
    WebsiteNotRegistered { name: String, feed_url: String },
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Counters for one [`FeedReader`](crate::feed::FeedReader) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedRunStats {
    pub total_entries: usize,
    pub processed: usize,
    /// Entries that were new to the store
    pub inserted: usize,
    pub errors: usize,
    pub images_added: usize,
    /// Articles hydrated from storage because nothing was processed
    pub loaded_from_history: usize,
    /// Size of the in-memory article list after the run
    pub in_memory: usize,
    /// Set when the feed could not be fetched or parsed
    pub fetch_error: Option<String>,
}

impl FeedRunStats {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Processed {
                inserted,
                image_added,
            } => {
                self.processed += 1;
                self.inserted += usize::from(*inserted);
                self.images_added += usize::from(*image_added);
            }
            // Feed entries are never skipped; treat it like an error if it happens
            ItemOutcome::Skipped(_) | ItemOutcome::Failed(_) => self.errors += 1,
        }
    }
}

/// Counters for one [`UrlContentExtractor`](crate::content::UrlContentExtractor) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UrlRunStats {
    /// URLs left after the pre-fetch filter
    pub total_urls: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub images_added: usize,
}

impl UrlRunStats {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Processed { image_added, .. } => {
                self.processed += 1;
                self.images_added += usize::from(*image_added);
            }
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.errors += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_stats_fold() {
        let mut stats = UrlRunStats {
            total_urls: 4,
            ..Default::default()
        };
        stats.record(&ItemOutcome::Processed {
            inserted: true,
            image_added: true,
        });
        stats.record(&ItemOutcome::Processed {
            inserted: false,
            image_added: false,
        });
        stats.record(&ItemOutcome::Skipped(SkipReason::BadStatus(404)));
        stats.record(&ItemOutcome::Failed(IngestError::Parse("bad".into())));

        assert_eq!(
            stats,
            UrlRunStats {
                total_urls: 4,
                processed: 2,
                skipped: 1,
                errors: 1,
                images_added: 1,
            }
        );
    }

    #[test]
    fn test_feed_stats_count_dedup_as_processed() {
        let mut stats = FeedRunStats::default();
        stats.record(&ItemOutcome::Processed {
            inserted: false,
            image_added: false,
        });
        stats.record(&ItemOutcome::Failed(IngestError::Validation("no link".into())));
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::BadStatus(404).to_string(), "HTTP status 404");
        assert_eq!(
            SkipReason::TitleTooShort(4).to_string(),
            "title too short (4 chars)"
        );
    }
}
