//! Reminder data model
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::{ChatId, ReminderError};

/// Unit of a relative time expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hours,
    Minutes,
}

/// Time extracted from a message, not yet tied to a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTime {
    /// Clock time of day, "о 19:30"
    Absolute { hour: u32, minute: u32 },
    /// Offset from now, "через 2 години"
    Relative { amount: u32, unit: TimeUnit },
}

impl ParsedTime {
    /// Resolve to a concrete instant relative to `now`.
    ///
    /// Absolute times are built on today's date in `zone`; a result at or
    /// before `now` moves 24 hours forward. A local time inside a DST gap is
    /// pushed one hour later, a repeated local time takes its first instance.
    pub fn resolve(&self, now: DateTime<Utc>, zone: Tz) -> Result<DateTime<Utc>, ReminderError> {
        match *self {
            ParsedTime::Absolute { hour, minute } => {
                let naive = now
                    .with_timezone(&zone)
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .ok_or_else(|| {
                        ReminderError::MalformedTime(format!("{hour:02}:{minute:02}"))
                    })?;

                let local = zone
                    .from_local_datetime(&naive)
                    .earliest()
                    .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
                    .ok_or_else(|| {
                        ReminderError::MalformedTime(format!(
                            "{hour:02}:{minute:02} не існує в зоні {}",
                            zone.name()
                        ))
                    })?;

                let candidate = local.with_timezone(&Utc);
                if candidate <= now {
                    Ok(candidate + Duration::hours(24))
                } else {
                    Ok(candidate)
                }
            }
            ParsedTime::Relative { amount, unit } => {
                let minutes = match unit {
                    TimeUnit::Hours => i64::from(amount) * 60,
                    TimeUnit::Minutes => i64::from(amount),
                };
                now.checked_add_signed(Duration::minutes(minutes))
                    .ok_or_else(|| ReminderError::MalformedTime("занадто далеко в майбутньому".into()))
            }
        }
    }
}

/// A matched reminder waiting for the user's cadence choice.
///
/// Holds the unresolved time so the instant is computed when the choice
/// arrives, not when the message was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReminder {
    pub chat_id: ChatId,
    pub description: String,
    pub time: ParsedTime,
}

impl PendingReminder {
    pub fn new(chat_id: ChatId, description: impl Into<String>, time: ParsedTime) -> Self {
        Self {
            chat_id,
            description: description.into(),
            time,
        }
    }

    pub fn target_instant(
        &self,
        now: DateTime<Utc>,
        zone: Tz,
    ) -> Result<DateTime<Utc>, ReminderError> {
        self.time.resolve(now, zone)
    }
}

/// One persisted, armed notification.
///
/// Two deliveries are the same iff chat, text and instant all match; the
/// derived `Eq`/`Hash` are that identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledDelivery {
    pub chat_id: ChatId,
    pub message_text: String,
    #[serde(rename = "fire_time")]
    pub fire_instant: DateTime<Utc>,
}

impl ScheduledDelivery {
    pub fn new(chat_id: ChatId, message_text: impl Into<String>, fire_instant: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            message_text: message_text.into(),
            fire_instant,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_instant <= now
    }
}
