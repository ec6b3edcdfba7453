//! Uncommitted reminders awaiting a cadence choice
//!
//! Process-lifetime only. Entries are never expired: a user who never picks a
//! cadence keeps exactly one entry until their next matching message.
//!
//! Each entry remembers the prompt message its choice buttons were sent with.
//! A choice only takes the entry when it comes from that prompt, so pressing
//! someone else's buttons in a shared channel does nothing.
//!
//! - **Version**: 1.1.0
//! - **Since**: 2.0.0
//!
//! ## Changelog
//! - 1.1.0: Entries bound to their prompt message
//! - 1.0.0: Initial registry

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

use super::models::PendingReminder;
use crate::core::{MessageRef, UserId};

#[derive(Debug, Clone)]
struct PendingEntry {
    reminder: PendingReminder,
    prompt: Option<MessageRef>,
}

impl PendingEntry {
    /// An unknown side on either end cannot be checked and is accepted
    fn accepts(&self, origin: Option<MessageRef>) -> bool {
        match (self.prompt, origin) {
            (Some(prompt), Some(origin)) => prompt == origin,
            _ => true,
        }
    }
}

#[derive(Clone, Default)]
pub struct PendingChoiceRegistry {
    entries: Arc<DashMap<UserId, PendingEntry>>,
}

impl PendingChoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pending` for `user_id`, silently replacing any earlier one
    pub fn put(&self, user_id: UserId, pending: PendingReminder) {
        let entry = PendingEntry {
            reminder: pending,
            prompt: None,
        };
        if self.entries.insert(user_id, entry).is_some() {
            debug!("Replaced unconsumed pending reminder for user {user_id}");
        }
    }

    /// Bind the user's entry to the prompt sent for it.
    ///
    /// Ignored when the entry was replaced by a newer reminder meanwhile.
    pub fn attach_prompt(
        &self,
        user_id: UserId,
        pending: &PendingReminder,
        prompt: MessageRef,
    ) -> bool {
        match self.entries.get_mut(&user_id) {
            Some(mut entry) if entry.reminder == *pending => {
                entry.prompt = Some(prompt);
                true
            }
            _ => false,
        }
    }

    /// Remove and return the user's pending reminder
    pub fn take(&self, user_id: UserId) -> Option<PendingReminder> {
        self.entries.remove(&user_id).map(|(_, entry)| entry.reminder)
    }

    /// Remove and return the user's pending reminder if a choice from
    /// `origin` may commit it. A mismatched origin leaves the entry in place.
    ///
    /// Also returns the bound prompt so a failed commit can be restored as it was.
    pub fn take_from(
        &self,
        user_id: UserId,
        origin: Option<MessageRef>,
    ) -> Option<(PendingReminder, Option<MessageRef>)> {
        self.entries
            .remove_if(&user_id, |_, entry| entry.accepts(origin))
            .map(|(_, entry)| (entry.reminder, entry.prompt))
    }

    /// Put back a reminder whose commit failed, unless a newer one arrived meanwhile.
    ///
    /// Returns `true` if the reminder was restored.
    pub fn restore(
        &self,
        user_id: UserId,
        pending: PendingReminder,
        prompt: Option<MessageRef>,
    ) -> bool {
        match self.entries.entry(user_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    reminder: pending,
                    prompt,
                });
                true
            }
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
