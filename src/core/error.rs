//! Reminder engine error taxonomy
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use std::path::PathBuf;
use thiserror::Error;

use super::messenger::ChatId;

#[derive(Debug, Error)]
pub enum ReminderError {
    /// The message carries no time expression. A routing decision, not a fault.
    #[error("no time expression in message")]
    NoTimeExpression,

    /// A pattern matched but its numbers are out of range
    #[error("malformed time: {0}")]
    MalformedTime(String),

    /// A cadence choice arrived with nothing registered for the user
    #[error("no pending reminder for this user")]
    NoPendingChoice,

    /// The task file could not be rewritten; the in-memory view was rolled back
    #[error("failed to persist reminders to {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transport refused a reminder at fire time
    #[error("delivery to chat {chat_id} failed: {reason}")]
    DeliveryFailure { chat_id: ChatId, reason: String },
}

impl ReminderError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReminderError::PersistenceFailure {
            path: path.into(),
            source,
        }
    }

    /// Reply text shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            ReminderError::NoTimeExpression => {
                "🤔 Не бачу часу в повідомленні. Напиши, наприклад, «зустріч о 19:30» або «полити квіти через 2 години».".to_string()
            }
            ReminderError::MalformedTime(detail) => {
                format!("❌ Некоректний час: {detail}. Перевір і надішли ще раз, наприклад «о 19:30».")
            }
            ReminderError::NoPendingChoice => {
                "Немає нагадування, яке чекає на вибір. Надішли задачу ще раз.".to_string()
            }
            ReminderError::PersistenceFailure { .. } => {
                "⚠️ Не вдалося зберегти нагадування. Спробуй ще раз трохи пізніше.".to_string()
            }
            ReminderError::DeliveryFailure { .. } => {
                "⚠️ Не вдалося надіслати нагадування.".to_string()
            }
        }
    }

    /// Whether the error should be shown as a blocking alert
    pub fn is_alert(&self) -> bool {
        matches!(self, ReminderError::PersistenceFailure { .. })
    }
}
