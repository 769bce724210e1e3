use chrono::{Local, Utc};

/// Current local date as a YYYYMMDD integer, e.g. `20240305`.
///
/// This is the marker every ingestion run stamps on the rows it writes.
pub fn today_stamp() -> i64 {
    Local::now()
        .format("%Y%m%d")
        .to_string()
        .parse()
        .unwrap_or_default()
}

/// Current time in unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}
