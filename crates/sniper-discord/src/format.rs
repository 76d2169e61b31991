//! Small pure formatting helpers for Discord output.

use chrono::{DateTime, Utc};

/// Clip to `max_chars` characters, ellipsis included.
pub(crate) fn truncate_with_dots(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Discord's client-side relative timestamp markup.
pub(crate) fn relative_timestamp(at: DateTime<Utc>) -> String {
    format!("<t:{}:R>", at.timestamp())
}
