use feed_rs::model::{Entry, MediaContent};
use feed_rs::parser;

use crate::util::{strip_control_chars, strip_query};

/// One syndication entry with every field checked by presence.
///
/// Feeds are loose about what an entry carries; normalization decides which
/// absent fields are fatal for the entry and which have defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    /// Unix seconds from `<pubDate>`/`<published>`, falling back to `<updated>`
    pub published_at: Option<i64>,
    /// First image media URL attached to the entry, query string removed
    pub image_url: Option<String>,
}

pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(into_entry).collect())
}

fn into_entry(entry: Entry) -> FeedEntry {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty());
    let published_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.timestamp());
    let summary = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .map(|s| clean(&s));
    let title = entry
        .title
        .map(|t| clean(&t.content))
        .filter(|t| !t.is_empty());
    let image_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|c| is_image(c))
        .find_map(|c| c.url.as_ref())
        .map(|url| strip_query(url.as_str()).to_string());

    FeedEntry {
        title,
        summary,
        link,
        published_at,
        image_url,
    }
}

/// Untyped media counts as an image; typed media must be `image/*`.
fn is_image(content: &MediaContent) -> bool {
    content
        .content_type
        .as_ref()
        .is_none_or(|mime| mime.to_string().to_ascii_lowercase().starts_with("image/"))
}

fn clean(s: &str) -> String {
    strip_control_chars(s).trim().to_string()
}
