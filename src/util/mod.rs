//! Small helpers shared by the feed and content pipelines.
//!
//! - **Text**: control-character stripping, query-string removal
//! - **Dates**: YYYYMMDD run-date stamps
//! - **HTML**: static CSS selector parsing

mod date;
mod html;
mod text;

pub use date::{now_unix, today_stamp};
pub(crate) use html::parse_selector;
pub use text::{parse_date_stamp, strip_control_chars, strip_query};
