//! Reminder service
//!
//! Owns the pending-choice registry, the shared task store and the scheduler,
//! and runs the two user-driven transitions: a matching message becomes a
//! pending reminder, a cadence choice commits it into armed deliveries.
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info, warn};

use super::cadence::Cadence;
use super::models::{PendingReminder, ScheduledDelivery};
use super::parser;
use super::pending::PendingChoiceRegistry;
use super::recovery::RecoveryRunner;
use super::scheduler::DeliveryScheduler;
use super::store::SharedTaskStore;
use crate::core::{IncomingMessage, MessageRef, ReminderError, UserId};

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedReminder {
    pub description: String,
    pub cadence: Cadence,
    pub event: DateTime<Utc>,
    /// Persisted and armed, earliest first
    pub deliveries: Vec<ScheduledDelivery>,
}

#[derive(Clone)]
pub struct ReminderService {
    zone: Tz,
    pending: PendingChoiceRegistry,
    store: SharedTaskStore,
    scheduler: DeliveryScheduler,
}

impl ReminderService {
    pub fn new(zone: Tz, store: SharedTaskStore, scheduler: DeliveryScheduler) -> Self {
        Self {
            zone,
            pending: PendingChoiceRegistry::new(),
            store,
            scheduler,
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn pending(&self) -> &PendingChoiceRegistry {
        &self.pending
    }

    pub fn scheduler(&self) -> &DeliveryScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &SharedTaskStore {
        &self.store
    }

    /// Runner for the one-off startup recovery over this service's store
    pub fn recovery(&self) -> RecoveryRunner {
        RecoveryRunner::new(self.store.clone(), self.scheduler.clone())
    }

    /// Parse `message` and register it as the sender's pending reminder.
    ///
    /// `NoTimeExpression` and `MalformedTime` leave the registry untouched.
    pub fn register(&self, message: &IncomingMessage) -> Result<PendingReminder, ReminderError> {
        let expression = parser::parse(&message.text)?.ok_or(ReminderError::NoTimeExpression)?;
        let pending = PendingReminder::new(message.chat_id, expression.description, expression.time);
        self.pending.put(message.user_id, pending.clone());
        info!(
            "Pending reminder for user {} in chat {}: {:?}",
            message.user_id, message.chat_id, pending.time
        );
        Ok(pending)
    }

    /// Record the prompt message sent for `pending`, so only choices made on
    /// it can commit the reminder
    pub fn prompt_sent(&self, user_id: UserId, pending: &PendingReminder, prompt: MessageRef) {
        if !self.pending.attach_prompt(user_id, pending, prompt) {
            debug!("Prompt {prompt:?} for user {user_id} outlived its pending reminder");
        }
    }

    /// Commit the user's pending reminder with `cadence`, resolving its time
    /// against `now`.
    pub async fn commit(
        &self,
        user_id: UserId,
        cadence: Cadence,
        now: DateTime<Utc>,
    ) -> Result<CommittedReminder, ReminderError> {
        self.commit_from(user_id, None, cadence, now).await
    }

    /// Commit the user's pending reminder from a choice made on `origin`.
    ///
    /// A choice on a prompt other than the user's own is `NoPendingChoice`
    /// and changes nothing. All deliveries are persisted in one write before
    /// any is armed. On a persistence failure the pending reminder is put back
    /// so the choice can be retried.
    pub async fn commit_from(
        &self,
        user_id: UserId,
        origin: Option<MessageRef>,
        cadence: Cadence,
        now: DateTime<Utc>,
    ) -> Result<CommittedReminder, ReminderError> {
        let (pending, prompt) = self
            .pending
            .take_from(user_id, origin)
            .ok_or(ReminderError::NoPendingChoice)?;

        match self.schedule(&pending, cadence, now).await {
            Ok(committed) => {
                info!(
                    "Committed reminder for user {user_id} in chat {}: {} deliveries, event at {}",
                    pending.chat_id,
                    committed.deliveries.len(),
                    committed.event
                );
                Ok(committed)
            }
            Err(e @ ReminderError::PersistenceFailure { .. }) => {
                if self.pending.restore(user_id, pending, prompt) {
                    warn!("Commit for user {user_id} failed, pending reminder kept for retry");
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn schedule(
        &self,
        pending: &PendingReminder,
        cadence: Cadence,
        now: DateTime<Utc>,
    ) -> Result<CommittedReminder, ReminderError> {
        let event = pending.target_instant(now, self.zone)?;
        let deliveries = cadence.expand(pending.chat_id, &pending.description, event, now);
        if deliveries.is_empty() {
            return Err(ReminderError::MalformedTime("цей час уже минув".to_string()));
        }

        self.store.lock().await.append_all(&deliveries)?;
        for delivery in &deliveries {
            self.scheduler.arm(delivery.clone());
        }

        Ok(CommittedReminder {
            description: pending.description.clone(),
            cadence,
            event,
            deliveries,
        })
    }
}
