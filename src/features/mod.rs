//! # Features
//!
//! Self-contained feature modules of the bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//!
//! ## Changelog
//! - 2.0.0: Reminders are the only feature
//! - 1.0.0: Initial grouping of feature modules

pub mod reminders;

pub use reminders::{DeliveryScheduler, RecoveryRunner, ReminderService, TaskStore};
