//! # Delivery Scheduler
//!
//! One tokio timer task per armed delivery, tracked by the delivery's
//! identity so it can be inspected and cancelled. On expiry the timer claims
//! its own entry, sends the text through the [`Messenger`] and removes the
//! record from the task store, whether or not the send succeeded.
//!
//! Delivery is at-most-once: a failed send is logged and never retried.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::models::ScheduledDelivery;
use super::store::SharedTaskStore;
use crate::core::{format_duration, Messenger, ReminderError, SendOptions};

#[derive(Clone)]
pub struct DeliveryScheduler {
    timers: Arc<DashMap<ScheduledDelivery, JoinHandle<()>>>,
    store: SharedTaskStore,
    messenger: Arc<dyn Messenger>,
    lateness_tolerance: chrono::Duration,
}

impl DeliveryScheduler {
    pub fn new(
        store: SharedTaskStore,
        messenger: Arc<dyn Messenger>,
        lateness_tolerance: Duration,
    ) -> Self {
        let lateness_tolerance = chrono::Duration::from_std(lateness_tolerance)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        Self {
            timers: Arc::new(DashMap::new()),
            store,
            messenger,
            lateness_tolerance,
        }
    }

    /// Arm a single-fire timer for `delivery`.
    ///
    /// A delivery already due fires right away. Returns `false` if an
    /// identical delivery is already armed.
    pub fn arm(&self, delivery: ScheduledDelivery) -> bool {
        match self.timers.entry(delivery.clone()) {
            Entry::Occupied(_) => {
                debug!(
                    "Reminder for chat {} at {} is already armed",
                    delivery.chat_id, delivery.fire_instant
                );
                false
            }
            Entry::Vacant(slot) => {
                let wait = (delivery.fire_instant - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                debug!(
                    "Armed reminder for chat {} at {} (in {}s)",
                    delivery.chat_id,
                    delivery.fire_instant,
                    wait.as_secs()
                );

                let scheduler = self.clone();
                // The entry lock is held until the handle is stored, so the
                // task cannot claim its slot before it exists.
                let handle = tokio::spawn(async move {
                    sleep(wait).await;
                    scheduler.fire(delivery).await;
                });
                slot.insert(handle);
                true
            }
        }
    }

    /// Disarm `delivery` and drop its store record.
    ///
    /// Idempotent: returns `Ok(false)` and touches nothing if it was not armed.
    pub async fn cancel(&self, delivery: &ScheduledDelivery) -> Result<bool, ReminderError> {
        let Some((_, handle)) = self.timers.remove(delivery) else {
            return Ok(false);
        };
        handle.abort();
        self.store.lock().await.remove(delivery)?;
        info!(
            "Cancelled reminder for chat {} at {}",
            delivery.chat_id, delivery.fire_instant
        );
        Ok(true)
    }

    /// Abort every timer, leaving the store untouched for the next recovery
    pub fn shutdown(&self) -> usize {
        let keys: Vec<ScheduledDelivery> = self.timers.iter().map(|e| e.key().clone()).collect();
        let mut aborted = 0;
        for key in keys {
            if let Some((_, handle)) = self.timers.remove(&key) {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            info!("Stopped {aborted} armed reminders");
        }
        aborted
    }

    pub fn is_armed(&self, delivery: &ScheduledDelivery) -> bool {
        self.timers.contains_key(delivery)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// Snapshot of the currently armed deliveries, earliest first
    pub fn armed(&self) -> Vec<ScheduledDelivery> {
        let mut armed: Vec<ScheduledDelivery> =
            self.timers.iter().map(|e| e.key().clone()).collect();
        armed.sort_by_key(|d| d.fire_instant);
        armed
    }

    async fn fire(&self, delivery: ScheduledDelivery) {
        // Whoever removes the entry owns the delivery; a concurrent cancel won
        if self.timers.remove(&delivery).is_none() {
            return;
        }

        let lateness = Utc::now() - delivery.fire_instant;
        let text = if lateness > self.lateness_tolerance {
            warn!(
                "Reminder for chat {} fired {}s late",
                delivery.chat_id,
                lateness.num_seconds()
            );
            late_text(&delivery.message_text, lateness)
        } else {
            info!("⏰ Delivering reminder to chat {}", delivery.chat_id);
            delivery.message_text.clone()
        };

        if let Err(e) = self
            .messenger
            .send_message(delivery.chat_id, &text, SendOptions::default())
            .await
        {
            let failure = ReminderError::DeliveryFailure {
                chat_id: delivery.chat_id,
                reason: e.to_string(),
            };
            error!("{failure} (not retried)");
        }

        if let Err(e) = self.store.lock().await.remove(&delivery) {
            error!("Fired reminder is still on disk and will be dropped at next start: {e}");
        }
    }
}

/// Text used when a delivery fires noticeably after its instant
pub fn late_text(message_text: &str, lateness: chrono::Duration) -> String {
    format!(
        "{message_text}\n\n(нагадування запізнилося на {})",
        format_duration(lateness.num_seconds())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::messenger::testing::RecordingMessenger;
    use crate::features::reminders::store::TaskStore;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: SharedTaskStore,
        messenger: Arc<RecordingMessenger>,
        scheduler: DeliveryScheduler,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::load(dir.path().join("tasks.json")).into_shared();
        let messenger = Arc::new(RecordingMessenger::new());
        let scheduler =
            DeliveryScheduler::new(store.clone(), messenger.clone(), Duration::from_secs(60));
        Fixture {
            _dir: dir,
            store,
            messenger,
            scheduler,
        }
    }

    async fn persist_and_arm(f: &Fixture, delivery: &ScheduledDelivery) -> bool {
        f.store.lock().await.append(delivery.clone()).unwrap();
        f.scheduler.arm(delivery.clone())
    }

    fn in_millis(ms: i64) -> chrono::DateTime<Utc> {
        Utc::now() + chrono::Duration::milliseconds(ms)
    }

    #[tokio::test]
    async fn test_fires_once_and_removes_record() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(42, "🔔 Нагадування: чай", in_millis(100));
        assert!(persist_and_arm(&f, &delivery).await);
        assert!(f.scheduler.is_armed(&delivery));

        sleep(Duration::from_millis(400)).await;

        assert_eq!(
            f.messenger.messages(),
            vec![(42, "🔔 Нагадування: чай".to_string())]
        );
        assert!(f.store.lock().await.is_empty());
        assert_eq!(f.scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_does_not_fire_early() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(1, "later", in_millis(2_000));
        persist_and_arm(&f, &delivery).await;

        sleep(Duration::from_millis(100)).await;
        assert!(f.messenger.messages().is_empty());
        assert!(f.store.lock().await.contains(&delivery));
        f.scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_past_due_fires_immediately_with_late_text() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(7, "🔔 Нагадування: x", in_millis(-5 * 60 * 1000));
        persist_and_arm(&f, &delivery).await;

        sleep(Duration::from_millis(100)).await;

        let messages = f.messenger.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.starts_with("🔔 Нагадування: x"));
        assert!(messages[0].1.contains("запізнилося на 5 хвилин"));
        assert!(f.store.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_slightly_late_within_tolerance_is_plain() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(7, "plain", in_millis(-1_000));
        persist_and_arm(&f, &delivery).await;

        sleep(Duration::from_millis(100)).await;
        assert_eq!(f.messenger.messages(), vec![(7, "plain".to_string())]);
    }

    #[tokio::test]
    async fn test_duplicate_arm_is_rejected() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(1, "once", in_millis(150));
        assert!(persist_and_arm(&f, &delivery).await);
        assert!(!f.scheduler.arm(delivery.clone()));
        assert_eq!(f.scheduler.armed_count(), 1);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(f.messenger.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_consumes_record() {
        let f = fixture();
        f.messenger.fail_sends(true);
        let delivery = ScheduledDelivery::new(3, "blocked", in_millis(50));
        persist_and_arm(&f, &delivery).await;

        sleep(Duration::from_millis(300)).await;
        assert!(f.store.lock().await.is_empty());
        assert_eq!(f.scheduler.armed_count(), 0);

        // Not retried once the transport recovers
        f.messenger.fail_sends(false);
        sleep(Duration::from_millis(200)).await;
        assert!(f.messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let f = fixture();
        let delivery = ScheduledDelivery::new(1, "cancel me", in_millis(200));
        persist_and_arm(&f, &delivery).await;

        assert!(f.scheduler.cancel(&delivery).await.unwrap());
        assert!(!f.scheduler.cancel(&delivery).await.unwrap());
        assert!(!f.scheduler.is_armed(&delivery));
        assert!(f.store.lock().await.is_empty());

        sleep(Duration::from_millis(400)).await;
        assert!(f.messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_keeps_store_for_recovery() {
        let f = fixture();
        let a = ScheduledDelivery::new(1, "a", in_millis(5_000));
        let b = ScheduledDelivery::new(1, "b", in_millis(6_000));
        persist_and_arm(&f, &a).await;
        persist_and_arm(&f, &b).await;
        assert_eq!(f.scheduler.armed(), vec![a.clone(), b.clone()]);

        assert_eq!(f.scheduler.shutdown(), 2);
        assert_eq!(f.scheduler.armed_count(), 0);
        assert_eq!(f.store.lock().await.len(), 2);
    }

    #[test]
    fn test_late_text() {
        let text = late_text("🔔 Нагадування: x", chrono::Duration::minutes(90));
        assert_eq!(
            text,
            "🔔 Нагадування: x\n\n(нагадування запізнилося на 1 година 30 хвилин)"
        );
    }
}
