//! Reminder conversation handler
//!
//! Handles: `/start`, free text with a time expression, cadence choices
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Free-text reminders with cadence buttons, replies via `Messenger`
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::is_command;
use crate::core::{
    format_duration, CallbackQuery, IncomingMessage, Messenger, ReminderError, SendOptions,
};
use crate::features::reminders::{Cadence, CommittedReminder, ReminderService};

/// Reply to `/start`
pub const GREETING: &str = "Привіт! Я твій асистент-планувальник. Напиши свою задачу.\n\
Наприклад: «Нагадай мені про зустріч о 19:30» або «полити квіти через 2 години».";

/// Callback acknowledgement after a successful commit
pub const SAVED_NOTICE: &str = "Нагадування збережено";

/// Routes transport events into the reminder service and replies
pub struct RemindHandler {
    service: ReminderService,
    messenger: Arc<dyn Messenger>,
}

impl RemindHandler {
    pub fn new(service: ReminderService, messenger: Arc<dyn Messenger>) -> Self {
        Self { service, messenger }
    }

    pub fn service(&self) -> &ReminderService {
        &self.service
    }

    /// Handle a plain text message
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<()> {
        if is_command(&message.text, "start") {
            self.messenger
                .send_message(message.chat_id, GREETING, SendOptions::default())
                .await?;
            return Ok(());
        }

        match self.service.register(message) {
            Ok(pending) => {
                let prompt = format!("Коли нагадати про «{}»?", pending.description);
                let sent = self
                    .messenger
                    .send_message(
                        message.chat_id,
                        &prompt,
                        SendOptions::with_choices(Cadence::choices()),
                    )
                    .await?;
                self.service.prompt_sent(message.user_id, &pending, sent);
            }
            Err(ReminderError::NoTimeExpression) => {
                debug!("No time expression from user {}, ignoring", message.user_id);
            }
            Err(e) => {
                info!("Rejected reminder from user {}: {e}", message.user_id);
                self.messenger
                    .send_message(message.chat_id, &e.user_message(), SendOptions::default())
                    .await?;
            }
        }
        Ok(())
    }

    /// Handle a cadence button press
    pub async fn handle_callback(&self, callback: &CallbackQuery) -> Result<()> {
        self.handle_callback_at(callback, Utc::now()).await
    }

    pub(crate) async fn handle_callback_at(
        &self,
        callback: &CallbackQuery,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(cadence) = Cadence::from_payload(&callback.payload) else {
            warn!(
                "Unknown callback payload {:?} from user {}",
                callback.payload, callback.user_id
            );
            self.messenger
                .answer_callback(&callback.callback_id, "Невідомий вибір.", false)
                .await?;
            return Ok(());
        };

        match self
            .service
            .commit_from(callback.user_id, callback.message, cadence, now)
            .await
        {
            Ok(committed) => {
                self.messenger
                    .answer_callback(&callback.callback_id, SAVED_NOTICE, false)
                    .await?;

                let confirmation = self.confirmation(&committed, now);
                match callback.message {
                    Some(target) => self.messenger.edit_message(target, &confirmation).await?,
                    None => {
                        if let Some(first) = committed.deliveries.first() {
                            self.messenger
                                .send_message(first.chat_id, &confirmation, SendOptions::default())
                                .await?;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Cadence choice from user {} failed: {e}", callback.user_id);
                self.messenger
                    .answer_callback(&callback.callback_id, &e.user_message(), e.is_alert())
                    .await?;
            }
        }
        Ok(())
    }

    fn confirmation(&self, committed: &CommittedReminder, now: DateTime<Utc>) -> String {
        let local = committed.event.with_timezone(&self.service.zone());
        let mut text = format!(
            "✅ Нагадаю про «{}» о {} (через {}).",
            committed.description,
            local.format("%H:%M, %d.%m.%Y"),
            format_duration((committed.event - now).num_seconds())
        );

        let warnings = committed.deliveries.len().saturating_sub(1);
        if committed.cadence == Cadence::Multiple {
            if warnings > 0 {
                text.push_str(&format!("\nПопереджень заздалегідь: {warnings}."));
            } else {
                text.push_str("\nДо події надто мало часу для попереджень.");
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::messenger::testing::{RecordingMessenger, Sent};
    use crate::core::MessageRef;
    use crate::features::reminders::{DeliveryScheduler, TaskStore};
    use chrono_tz::Europe::Kyiv;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        messenger: Arc<RecordingMessenger>,
        handler: RemindHandler,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::load(dir.path().join("tasks.json")).into_shared();
        let messenger = Arc::new(RecordingMessenger::new());
        let scheduler = DeliveryScheduler::new(
            store.clone(),
            messenger.clone(),
            std::time::Duration::from_secs(60),
        );
        let service = ReminderService::new(Kyiv, store, scheduler);
        let handler = RemindHandler::new(service, messenger.clone());
        Fixture {
            _dir: dir,
            messenger,
            handler,
        }
    }

    fn text(user_id: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: 500,
            user_id,
            text: text.to_string(),
        }
    }

    fn choice(user_id: i64, payload: &str) -> CallbackQuery {
        CallbackQuery {
            user_id,
            callback_id: "cb-1".to_string(),
            payload: payload.to_string(),
            message: Some(MessageRef {
                chat_id: 500,
                message_id: 1,
            }),
        }
    }

    #[tokio::test]
    async fn test_start_greets_without_scheduling() {
        let f = fixture();
        f.handler.handle_message(&text(1, "/start")).await.unwrap();

        assert_eq!(f.messenger.messages(), vec![(500, GREETING.to_string())]);
        assert!(f.handler.service().pending().is_empty());
    }

    #[tokio::test]
    async fn test_match_prompts_with_cadence_choices() {
        let f = fixture();
        f.handler
            .handle_message(&text(1, "Нагадай мені про зустріч о 19:30"))
            .await
            .unwrap();

        match &f.messenger.sent()[0] {
            Sent::Message { text, options, .. } => {
                assert_eq!(text, "Коли нагадати про «зустріч»?");
                let ids: Vec<&str> = options.choices.iter().map(|c| c.id.as_str()).collect();
                assert_eq!(ids, vec!["remind_once", "remind_multiple"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.handler.service().pending().contains(1));
    }

    #[tokio::test]
    async fn test_no_time_is_left_unanswered() {
        let f = fixture();
        f.handler.handle_message(&text(1, "привіт")).await.unwrap();
        f.handler
            .handle_message(&text(2, "хто йде на обід?"))
            .await
            .unwrap();

        assert!(f.messenger.sent().is_empty());
        assert!(f.handler.service().pending().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_time_asks_for_correction() {
        let f = fixture();
        f.handler.handle_message(&text(1, "at 25:99")).await.unwrap();

        let messages = f.messenger.messages();
        assert!(messages[0].1.starts_with("❌ Некоректний час"));
        assert!(f.handler.service().pending().is_empty());
    }

    #[tokio::test]
    async fn test_choice_commits_and_edits_prompt() {
        let f = fixture();
        f.handler
            .handle_message(&text(1, "зустріч через 30 хвилин"))
            .await
            .unwrap();
        f.messenger.clear();

        f.handler
            .handle_callback(&choice(1, "remind_multiple"))
            .await
            .unwrap();

        let sent = f.messenger.sent();
        assert_eq!(
            sent[0],
            Sent::Answer {
                callback_id: "cb-1".to_string(),
                text: SAVED_NOTICE.to_string(),
                is_alert: false
            }
        );
        match &sent[1] {
            Sent::Edit { target, text } => {
                assert_eq!(target.message_id, 1);
                assert!(text.contains("«зустріч»"));
                assert!(text.contains("Попереджень заздалегідь: 2."));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.handler.service().scheduler().armed_count(), 3);
        f.handler.service().scheduler().shutdown();
    }

    #[tokio::test]
    async fn test_choice_on_another_users_prompt_is_refused() {
        let f = fixture();
        f.handler
            .handle_message(&text(1, "обід через 2 години"))
            .await
            .unwrap();
        f.handler
            .handle_message(&text(2, "дзвінок через 3 години"))
            .await
            .unwrap();
        f.messenger.clear();

        // message 1 is user 1's prompt
        f.handler
            .handle_callback(&choice(2, "remind_once"))
            .await
            .unwrap();

        assert_eq!(
            f.messenger.sent(),
            vec![Sent::Answer {
                callback_id: "cb-1".to_string(),
                text: ReminderError::NoPendingChoice.user_message(),
                is_alert: false
            }]
        );
        assert!(f.handler.service().pending().contains(1));
        assert!(f.handler.service().pending().contains(2));
        assert_eq!(f.handler.service().scheduler().armed_count(), 0);

        f.messenger.clear();
        f.handler
            .handle_callback(&choice(1, "remind_once"))
            .await
            .unwrap();
        match &f.messenger.sent()[1] {
            Sent::Edit { target, text } => {
                assert_eq!(target.message_id, 1);
                assert!(text.contains("«обід»"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.handler.service().pending().contains(2));
        f.handler.service().scheduler().shutdown();
    }

    #[test]
    fn test_saved_notice_text() {
        assert_eq!(SAVED_NOTICE, "Нагадування збережено");
    }

    #[tokio::test]
    async fn test_choice_without_pending_is_transient_notice() {
        let f = fixture();
        f.handler
            .handle_callback(&choice(7, "remind_once"))
            .await
            .unwrap();

        assert_eq!(
            f.messenger.sent(),
            vec![Sent::Answer {
                callback_id: "cb-1".to_string(),
                text: ReminderError::NoPendingChoice.user_message(),
                is_alert: false
            }]
        );
        assert!(f.handler.service().store().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_payload_is_ignored() {
        let f = fixture();
        f.handler
            .handle_message(&text(1, "через 2 години"))
            .await
            .unwrap();
        f.handler
            .handle_callback(&choice(1, "remind_forever"))
            .await
            .unwrap();

        assert!(f.handler.service().pending().contains(1));
        assert_eq!(f.handler.service().scheduler().armed_count(), 0);
    }

    #[tokio::test]
    async fn test_confirmation_sent_when_origin_unknown() {
        let f = fixture();
        f.handler
            .handle_message(&text(1, "через 2 години"))
            .await
            .unwrap();
        f.messenger.clear();

        let mut callback = choice(1, "remind_once");
        callback.message = None;
        let now = Utc::now();
        f.handler.handle_callback_at(&callback, now).await.unwrap();

        let messages = f.messenger.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, 500);
        assert!(messages[0].1.contains("через 2 години"));
        f.handler.service().scheduler().shutdown();
    }
}
