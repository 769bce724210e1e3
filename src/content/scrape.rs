//! Heuristic extraction of article fields from an HTML page.
//!
//! Each field walks a short fallback chain:
//!
//! | Field     | Tried in order                                         |
//! |-----------|--------------------------------------------------------|
//! | title     | `<title>` text, then the page URL                      |
//! | summary   | `meta[name=description]`, first `<p>`, then empty      |
//! | published | `article:published_time` date part, then the run date  |
//! | image     | `og:image`, then the first `<img src>`                 |
//!
//! `scraper::Html` is not `Send`, so parsing stays in this synchronous module
//! and only owned strings leave it.

use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

use crate::util::{parse_date_stamp, parse_selector, strip_control_chars, strip_query};

/// Fields lifted from one page, before the quality gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    pub summary: String,
    /// YYYYMMDD marker
    pub published: i64,
    /// Unix seconds from `article:published_time`, when it is a full timestamp
    pub published_at: Option<i64>,
    pub image_url: Option<String>,
}

struct Selectors {
    title: Selector,
    description: Selector,
    paragraph: Selector,
    published_time: Selector,
    og_image: Selector,
    image: Selector,
}

fn selectors() -> Option<&'static Selectors> {
    static SELECTORS: OnceLock<Option<Selectors>> = OnceLock::new();
    SELECTORS
        .get_or_init(|| {
            Some(Selectors {
                title: parse_selector("title")?,
                description: parse_selector(r#"meta[name="description"]"#)?,
                paragraph: parse_selector("p")?,
                published_time: parse_selector(r#"meta[property="article:published_time"]"#)?,
                og_image: parse_selector(r#"meta[property="og:image"]"#)?,
                image: parse_selector("img[src]")?,
            })
        })
        .as_ref()
}

pub fn scrape_article(html: &str, page_url: &str, run_date: i64) -> ScrapedPage {
    let Some(sel) = selectors() else {
        return ScrapedPage {
            title: page_url.to_string(),
            summary: String::new(),
            published: run_date,
            published_at: None,
            image_url: None,
        };
    };
    let document = Html::parse_document(html);

    let title = document
        .select(&sel.title)
        .next()
        .map(|t| clean(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| page_url.to_string());

    let summary = document
        .select(&sel.description)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(clean)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            document
                .select(&sel.paragraph)
                .next()
                .map(|p| clean(&p.text().collect::<String>()))
        })
        .unwrap_or_default();

    let published_time = document
        .select(&sel.published_time)
        .next()
        .and_then(|m| m.value().attr("content"));
    let published = published_time
        .and_then(parse_date_stamp)
        .unwrap_or(run_date);
    let published_at = published_time
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t.trim()).ok())
        .map(|dt| dt.timestamp());

    let image_url = document
        .select(&sel.og_image)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .or_else(|| {
            document
                .select(&sel.image)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::trim)
                .filter(|src| !src.is_empty())
        })
        .map(|src| resolve(page_url, src))
        .map(|src| strip_query(&src).to_string());

    ScrapedPage {
        title,
        summary,
        published,
        published_at,
        image_url,
    }
}

fn clean(s: &str) -> String {
    strip_control_chars(s).trim().to_string()
}

/// Resolves a possibly relative `src` against the page. Unresolvable values
/// are kept as written.
fn resolve(page_url: &str, src: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(String::from)
        .unwrap_or_else(|_| src.to_string())
}
