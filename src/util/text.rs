use std::borrow::Cow;

/// Removes control characters from text scraped or parsed from the network.
///
/// Tab, newline and carriage return are kept. Returns `Cow::Borrowed` when
/// nothing needs stripping, which is the common case.
///
/// # Examples
///
/// ```
/// use newsfeed::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain"), "plain");
/// assert_eq!(strip_control_chars("bell\x07 ring"), "bell ring");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let keep = |c: char| !c.is_control() || matches!(c, '\t' | '\n' | '\r');
    if s.chars().all(keep) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| keep(c)).collect())
}

/// Drops everything from the first `?` onward.
///
/// Image URLs are compared without their query string, so CDN resizing
/// parameters do not produce distinct rows for the same picture.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(pos) => &url[..pos],
        None => url,
    }
}

/// Parses the date part of an ISO-8601 timestamp into a YYYYMMDD integer.
///
/// `"2024-03-05T10:00:00Z"` becomes `20240305`. Anything that is not all
/// digits once the dashes are removed yields `None`.
pub fn parse_date_stamp(value: &str) -> Option<i64> {
    let date = value.trim().split('T').next()?;
    let digits: String = date.chars().filter(|&c| c != '-').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
