//! Time expression parser
//!
//! Recognises two fixed patterns in free-form text:
//!
//! - absolute clock time, `H:MM` / `HH:MM` ("зустріч о 19:30")
//! - relative offset, `через N годин|хвилин` ("полити квіти через 2 години")
//!
//! English `in N hours|minutes` is accepted as an alias of the relative form.
//! The text before the match, minus filler words, becomes the description.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::error;
use regex::Regex;
use std::sync::OnceLock;

use super::models::{ParsedTime, TimeUnit};
use crate::core::{truncate_chars, ReminderError};

/// Description used when nothing meaningful precedes the time
pub const PLACEHOLDER_DESCRIPTION: &str = "подія";

/// Longest description kept, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Unit tokens starting with one of these are hours, anything else is minutes
const HOUR_ROOTS: [&str; 2] = ["год", "h"];

struct Patterns {
    absolute: Regex,
    relative: Regex,
    filler: Regex,
    trailing_preposition: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            absolute: Regex::new(r"\b([0-9]{1,2}):([0-9]{2})\b")?,
            relative: Regex::new(r"(?i)(?:^|\s)(?:через|in)\s+([0-9]+)\s*(\p{L}+)")?,
            filler: Regex::new(
                r"(?i)\b(?:нагадай\s+мені|нагадати\s+мені|нагадай|нагадати|про|remind\s+me|remind|about)\b",
            )?,
            trailing_preposition: Regex::new(r"(?i)(?:^|\s)(?:о|об|в|на|at)[\s\p{P}]*$")?,
        })
    }
}

static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();

/// Compiled once; `None` if compilation failed, in which case nothing matches
fn patterns() -> Option<&'static Patterns> {
    PATTERNS
        .get_or_init(|| match Patterns::compile() {
            Ok(patterns) => Some(patterns),
            Err(e) => {
                error!("Failed to compile time expression patterns: {e}");
                None
            }
        })
        .as_ref()
}

/// A recognised time expression and what it is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeExpression {
    pub time: ParsedTime,
    pub description: String,
}

impl TimeExpression {
    pub fn resolve(&self, now: DateTime<Utc>, zone: Tz) -> Result<DateTime<Utc>, ReminderError> {
        self.time.resolve(now, zone)
    }
}

/// Extract a time expression from `text`.
///
/// `Ok(None)` means the message carries no time at all and must not enter the
/// scheduling flow. A pattern with out-of-range numbers is `MalformedTime`.
pub fn parse(text: &str) -> Result<Option<TimeExpression>, ReminderError> {
    let Some(patterns) = patterns() else {
        return Ok(None);
    };

    if let Some(caps) = patterns.absolute.captures(text) {
        let (Some(whole), Some(hour), Some(minute)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            return Ok(None);
        };
        let hour: u32 = hour
            .as_str()
            .parse()
            .map_err(|_| ReminderError::MalformedTime(whole.as_str().to_string()))?;
        let minute: u32 = minute
            .as_str()
            .parse()
            .map_err(|_| ReminderError::MalformedTime(whole.as_str().to_string()))?;

        if hour > 23 {
            return Err(ReminderError::MalformedTime(format!(
                "{}: година має бути від 0 до 23",
                whole.as_str()
            )));
        }
        if minute > 59 {
            return Err(ReminderError::MalformedTime(format!(
                "{}: хвилини мають бути від 0 до 59",
                whole.as_str()
            )));
        }

        return Ok(Some(TimeExpression {
            time: ParsedTime::Absolute { hour, minute },
            description: describe(patterns, &text[..whole.start()]),
        }));
    }

    if let Some(caps) = patterns.relative.captures(text) {
        let (Some(whole), Some(amount), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            return Ok(None);
        };
        let amount: u32 = amount.as_str().parse().map_err(|_| {
            ReminderError::MalformedTime(format!("{}: занадто велике число", amount.as_str()))
        })?;
        if amount == 0 {
            return Err(ReminderError::MalformedTime(
                "проміжок має бути більшим за нуль".to_string(),
            ));
        }

        let unit = unit.as_str().to_lowercase();
        let unit = if HOUR_ROOTS.iter().any(|root| unit.starts_with(root)) {
            TimeUnit::Hours
        } else {
            TimeUnit::Minutes
        };

        return Ok(Some(TimeExpression {
            time: ParsedTime::Relative { amount, unit },
            description: describe(patterns, &text[..whole.start()]),
        }));
    }

    Ok(None)
}

/// Turn the text preceding a time expression into a description
fn describe(patterns: &Patterns, prefix: &str) -> String {
    let without_fillers = patterns.filler.replace_all(prefix, " ");
    let without_preposition = patterns
        .trailing_preposition
        .replace(&without_fillers, "");
    let collapsed = without_preposition
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = collapsed.trim_matches(|c: char| {
        c.is_whitespace() || c.is_ascii_punctuation() || matches!(c, '—' | '–' | '«' | '»')
    });

    if trimmed.is_empty() {
        PLACEHOLDER_DESCRIPTION.to_string()
    } else {
        truncate_chars(trimmed, MAX_DESCRIPTION_CHARS)
    }
}
