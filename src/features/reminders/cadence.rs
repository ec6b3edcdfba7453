//! Notification cadence and its expansion into deliveries
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::{DateTime, Duration, Utc};

use super::models::ScheduledDelivery;
use crate::core::{format_duration, ChatId, Choice};

/// Callback payload for a single delivery at event time
pub const REMIND_ONCE: &str = "remind_once";
/// Callback payload for event time plus two earlier warnings
pub const REMIND_MULTIPLE: &str = "remind_multiple";

/// Minutes before the event at which `Multiple` warns
pub const WARNING_OFFSETS_MINUTES: [i64; 2] = [10, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Once,
    Multiple,
}

impl Cadence {
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            REMIND_ONCE => Some(Cadence::Once),
            REMIND_MULTIPLE => Some(Cadence::Multiple),
            _ => None,
        }
    }

    pub fn payload(self) -> &'static str {
        match self {
            Cadence::Once => REMIND_ONCE,
            Cadence::Multiple => REMIND_MULTIPLE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cadence::Once => "🔔 Один раз",
            Cadence::Multiple => "🔔 За 10 і 5 хв + вчасно",
        }
    }

    /// Buttons offered after a time expression is recognised
    pub fn choices() -> Vec<Choice> {
        [Cadence::Once, Cadence::Multiple]
            .into_iter()
            .map(|c| Choice::new(c.payload(), c.label()))
            .collect()
    }

    /// Expand into concrete deliveries, earliest first.
    ///
    /// The event-time delivery is always produced; warnings only when their
    /// instant is still after `now`. Anything at or before `now` is dropped.
    pub fn expand(
        self,
        chat_id: ChatId,
        description: &str,
        event: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<ScheduledDelivery> {
        let mut deliveries = Vec::with_capacity(3);

        if self == Cadence::Multiple {
            for minutes in WARNING_OFFSETS_MINUTES {
                let fire = event - Duration::minutes(minutes);
                if fire > now {
                    deliveries.push(ScheduledDelivery::new(
                        chat_id,
                        warning_text(minutes, description),
                        fire,
                    ));
                }
            }
        }

        if event > now {
            deliveries.push(ScheduledDelivery::new(chat_id, event_text(description), event));
        }

        deliveries.sort_by_key(|d| d.fire_instant);
        deliveries
    }
}

/// Text delivered at the event time
pub fn event_text(description: &str) -> String {
    format!("🔔 Нагадування: {description}")
}

/// Text delivered `minutes` before the event
pub fn warning_text(minutes: i64, description: &str) -> String {
    format!("⏳ Через {}: {description}", format_duration(minutes * 60))
}
