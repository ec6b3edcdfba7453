//! Reply formatting helpers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Ukrainian duration formatting for reminder confirmations
//! - 1.0.0: Extracted from duplicate implementations in command handlers

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Truncate text to fit message limit, adding ellipsis if needed
pub fn truncate_for_message(text: &str) -> String {
    if text.len() <= MESSAGE_LIMIT {
        text.to_string()
    } else {
        // Find a safe UTF-8 boundary
        let mut end = MESSAGE_LIMIT - 3; // Room for "..."
        while !text.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

/// Truncate to at most `max_chars` characters, adding an ellipsis if cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// Pick the Ukrainian noun form for `n`: one / few / many
fn plural<'a>(n: i64, one: &'a str, few: &'a str, many: &'a str) -> &'a str {
    let n = n.abs();
    let (last, last_two) = (n % 10, n % 100);
    if last == 1 && last_two != 11 {
        one
    } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
        few
    } else {
        many
    }
}

fn unit(n: i64, one: &str, few: &str, many: &str) -> String {
    format!("{} {}", n, plural(n, one, few, many))
}

/// Format a duration in seconds into a human-readable Ukrainian string
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        unit(seconds, "секунда", "секунди", "секунд")
    } else if seconds < 3600 {
        unit(seconds / 60, "хвилина", "хвилини", "хвилин")
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!(
                "{} {}",
                unit(hours, "година", "години", "годин"),
                unit(mins, "хвилина", "хвилини", "хвилин")
            )
        } else {
            unit(hours, "година", "години", "годин")
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!(
                "{} {}",
                unit(days, "день", "дні", "днів"),
                unit(hours, "година", "години", "годин")
            )
        } else {
            unit(days, "день", "дні", "днів")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30 секунд");
        assert_eq!(format_duration(1), "1 секунда");
        assert_eq!(format_duration(60), "1 хвилина");
        assert_eq!(format_duration(120), "2 хвилини");
        assert_eq!(format_duration(300), "5 хвилин");
        assert_eq!(format_duration(3600), "1 година");
        assert_eq!(format_duration(7200), "2 години");
        assert_eq!(format_duration(3660), "1 година 1 хвилина");
        assert_eq!(format_duration(86400), "1 день");
        assert_eq!(format_duration(90000), "1 день 1 година");
        assert_eq!(format_duration(5 * 86400), "5 днів");
    }

    #[test]
    fn test_plural_teens() {
        assert_eq!(format_duration(11 * 60), "11 хвилин");
        assert_eq!(format_duration(21 * 60), "21 хвилина");
        assert_eq!(format_duration(12 * 60), "12 хвилин");
        assert_eq!(format_duration(22 * 60), "22 хвилини");
    }

    #[test]
    fn test_negative_duration_clamps() {
        assert_eq!(format_duration(-5), "0 секунд");
    }

    #[test]
    fn test_truncate_for_message() {
        assert_eq!(truncate_for_message("short"), "short");
        let long = "ї".repeat(1500);
        let result = truncate_for_message(&long);
        assert!(result.len() <= MESSAGE_LIMIT);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("зустріч", 10), "зустріч");
        assert_eq!(truncate_chars("полити квіти", 7), "полити…");
    }
}
