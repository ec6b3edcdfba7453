// Core layer - config, errors, messaging seam
pub mod core;

// Features layer - reminder engine
pub mod features;

// Application layer - inbound event routing
pub mod commands;

// Re-export commonly used items
pub use crate::core::Config;

pub use features::reminders::{
    Cadence, DeliveryScheduler, PendingChoiceRegistry, RecoveryReport, RecoveryRunner,
    ReminderService, ScheduledDelivery, TaskStore,
};

pub use commands::RemindHandler;
