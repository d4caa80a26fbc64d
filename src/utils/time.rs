use chrono::{DateTime, Utc};

/// Text form of completion dates in exported spreadsheets and CSV files.
pub const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_export_date(dt: DateTime<Utc>) -> String {
    dt.format(EXPORT_DATE_FORMAT).to_string()
}
