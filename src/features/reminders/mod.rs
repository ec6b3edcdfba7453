//! # Reminders Feature
//!
//! Text-triggered reminders: a message with a time expression becomes a
//! pending reminder, the user's cadence choice commits it into one or more
//! persisted deliveries, and a startup recovery re-arms whatever is still
//! ahead after a restart.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Free-text time parsing, cadence choice, file-backed store with recovery
//! - 1.0.0: Initial polling scheduler

pub mod cadence;
pub mod models;
pub mod parser;
pub mod pending;
pub mod recovery;
pub mod scheduler;
pub mod service;
pub mod store;

pub use cadence::{Cadence, REMIND_MULTIPLE, REMIND_ONCE};
pub use models::{ParsedTime, PendingReminder, ScheduledDelivery, TimeUnit};
pub use parser::{parse, TimeExpression};
pub use pending::PendingChoiceRegistry;
pub use recovery::{RecoveryReport, RecoveryRunner};
pub use scheduler::DeliveryScheduler;
pub use service::{CommittedReminder, ReminderService};
pub use store::{SharedTaskStore, TaskStore};
