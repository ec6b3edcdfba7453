//! Startup recovery
//!
//! Runs once before any new input is accepted: reloads the task file, drops
//! entries whose instant has passed, persists the survivors as the new
//! baseline and re-arms each of them.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::{DateTime, Utc};
use log::info;

use super::models::ScheduledDelivery;
use super::scheduler::DeliveryScheduler;
use super::store::SharedTaskStore;
use crate::core::ReminderError;

/// Counts reported after recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Timers created by this run
    pub rearmed: usize,
    /// Future entries that already had a timer
    pub already_armed: usize,
    /// Past-due entries removed from the store
    pub dropped: usize,
}

pub struct RecoveryRunner {
    store: SharedTaskStore,
    scheduler: DeliveryScheduler,
}

impl RecoveryRunner {
    pub fn new(store: SharedTaskStore, scheduler: DeliveryScheduler) -> Self {
        Self { store, scheduler }
    }

    /// Recover against `now`. Consumes the runner: recovery happens once.
    ///
    /// Entries due exactly at `now` are kept and fire immediately. If the
    /// baseline cannot be written nothing is armed.
    pub async fn run(self, now: DateTime<Utc>) -> Result<RecoveryReport, ReminderError> {
        let (keep, dropped) = {
            let mut store = self.store.lock().await;
            let loaded = store.reload().to_vec();
            let (keep, stale): (Vec<ScheduledDelivery>, Vec<ScheduledDelivery>) =
                loaded.into_iter().partition(|d| d.fire_instant >= now);

            for delivery in &stale {
                info!(
                    "Dropping past-due reminder for chat {} (was due {})",
                    delivery.chat_id, delivery.fire_instant
                );
            }

            store.replace_all(keep.clone())?;
            (keep, stale.len())
        };

        let mut report = RecoveryReport {
            dropped,
            ..RecoveryReport::default()
        };
        for delivery in keep {
            if self.scheduler.arm(delivery) {
                report.rearmed += 1;
            } else {
                report.already_armed += 1;
            }
        }

        info!(
            "♻️ Recovery complete: {} re-armed, {} already armed, {} past-due dropped",
            report.rearmed, report.already_armed, report.dropped
        );
        Ok(report)
    }
}
