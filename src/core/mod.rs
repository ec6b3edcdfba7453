//! # Core Module
//!
//! Configuration, error taxonomy, the messaging seam and reply formatting
//! shared by the reminder engine and the transport adapter.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Reminder engine error taxonomy and `Messenger` transport seam
//! - 1.1.0: Add response module with message length and duration helpers
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;
pub mod messenger;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use error::ReminderError;
pub use messenger::{
    CallbackQuery, ChatId, Choice, IncomingMessage, MessageRef, Messenger, SendOptions, UserId,
};
pub use response::{format_duration, truncate_chars, truncate_for_message, MESSAGE_LIMIT};
