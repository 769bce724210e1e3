use thiserror::Error;
use url::Url;

/// Social and video platforms whose links are never articles.
///
/// Matched as a substring of the host, so `m.youtube.com` and
/// `youtube.com.evil.example` are both caught.
pub const EXCLUDED_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "facebook.com",
    "twitter.com",
    "t.co",
    "reddit.com",
    "instagram.com",
    "linkedin.com",
    "pinterest.com",
    "tiktok.com",
    "discord.com",
    "telegram.org",
    "vk.com",
    "snapchat.com",
    "tumblr.com",
    "wechat.com",
    "weibo.com",
];

/// Path suffixes of bare image files.
pub const EXCLUDED_EXTENSIONS: &[&str] = &[".gif", ".jpg", ".jpeg", ".png", ".webp", ".svg"];

/// Why a URL was dropped before fetching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlRejection {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The host belongs to a social or video platform.
    #[error("Excluded domain: {0}")]
    ExcludedDomain(String),
    /// The path points at an image file.
    #[error("Image file: {0}")]
    ImageFile(String),
}

/// Checks whether a URL may point at an article page.
///
/// Pure: no network access. Rejected URLs never reach a fetch.
///
/// # Examples
///
/// ```
/// use newsfeed::content::check_article_url;
///
/// assert!(check_article_url("https://example.com/article").is_ok());
/// assert!(check_article_url("https://youtube.com/x").is_err());
/// assert!(check_article_url("https://example.com/x.jpg").is_err());
/// assert!(check_article_url("ftp://example.com").is_err());
/// ```
pub fn check_article_url(url_str: &str) -> Result<Url, UrlRejection> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlRejection::UnsupportedScheme(scheme.to_owned())),
    }

    // Url already lowercases the host
    let host = url.host_str().unwrap_or("");
    if let Some(domain) = EXCLUDED_DOMAINS.iter().find(|d| host.contains(*d)) {
        return Err(UrlRejection::ExcludedDomain((*domain).to_string()));
    }

    let path = url.path().to_lowercase();
    if let Some(ext) = EXCLUDED_EXTENSIONS.iter().find(|e| path.ends_with(*e)) {
        return Err(UrlRejection::ImageFile((*ext).to_string()));
    }

    Ok(url)
}

pub fn is_article_url(url_str: &str) -> bool {
    check_article_url(url_str).is_ok()
}
