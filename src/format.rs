//! Display helpers: relative times, avatar initials, compact counts.

use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Describe how long ago `timestamp` was, relative to `now` (both in ms).
///
/// Each unit is floor-divided from the previous one: seconds, minutes,
/// hours, days, weeks below four, then months of 30 days and years of 365.
pub fn relative_time(timestamp: i64, now: i64) -> String {
    let seconds = (now - timestamp).max(0) / 1000;
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return ago(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return ago(hours, "hour");
    }

    let days = hours / 24;
    if days < 7 {
        return ago(days, "day");
    }

    let weeks = days / 7;
    if weeks < 4 {
        return ago(weeks, "week");
    }

    // 28-29 days and 360-364 days would floor to zero; round those up to one.
    let months = (days / 30).max(1);
    if months < 12 {
        return ago(months, "month");
    }

    ago((days / 365).max(1), "year")
}

fn ago(count: i64, unit: &str) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

/// Avatar initials for a display name; `"U"` when there is no name.
pub fn initials(name: Option<&str>) -> String {
    let words: Vec<&str> = name.unwrap_or_default().split_whitespace().collect();

    let first_char = |word: &str| word.chars().next().map(|c| c.to_uppercase().collect::<String>());

    match words.as_slice() {
        [] => "U".to_string(),
        [only] => first_char(*only).unwrap_or_else(|| "U".to_string()),
        [first, .., last] => {
            let mut out = first_char(*first).unwrap_or_default();
            out.push_str(&first_char(*last).unwrap_or_default());
            out
        }
    }
}

/// `@handle` derived from a display name: lowercased, whitespace removed.
pub fn username_handle(name: &str) -> String {
    let handle: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    format!("@{handle}")
}

/// 999 → `999`, 1500 → `1.5K`, 2_000_000 → `2.0M`.
pub fn format_count(count: u64) -> String {
    if count < 1_000 {
        count.to_string()
    } else if count < 1_000_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
