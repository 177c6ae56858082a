use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub fn format_date(date: &DateTime<Utc>, format: &str, timezone: Tz) -> String {
    date.with_timezone(&timezone).format(format).to_string()
}
