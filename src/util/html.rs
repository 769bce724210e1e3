use scraper::Selector;

/// Parses a static CSS selector, logging instead of panicking if it is invalid.
pub(crate) fn parse_selector(css: &'static str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::error!(selector = css, error = ?e, "Invalid CSS selector");
            None
        }
    }
}
