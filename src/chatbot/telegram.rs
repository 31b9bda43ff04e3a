//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::html;
use tracing::{info, warn};

use crate::chatbot::proposals::{Action, Proposal};

/// Outbound messages the engine sends on its own (not as a reply).
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, String>;

    /// Send the approve/reject card for a proposal.
    async fn send_approval_card(&self, chat_id: i64, proposal: &Proposal) -> Result<i64, String>;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to edit message: {e}");
                warn!("{}", msg);
                msg
            })
    }

    /// Answer a button press so the client stops its spinner.
    pub async fn answer_callback(&self, query: &CallbackQuery, text: &str) -> Result<(), String> {
        self.bot
            .answer_callback_query(query.id.clone())
            .text(text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to answer callback: {e}");
                warn!("{}", msg);
                msg
            })
    }
}

#[async_trait]
impl Outbox for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_approval_card(&self, chat_id: i64, proposal: &Proposal) -> Result<i64, String> {
        info!("⚠️ Asking {} to approve proposal {}", chat_id, proposal.id);

        self.bot
            .send_message(ChatId(chat_id), approval_card_text(proposal))
            .parse_mode(ParseMode::Html)
            .reply_markup(approval_keyboard(&proposal.id))
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send approval card: {e}");
                warn!("{}", msg);
                msg
            })
    }
}

pub fn approval_card_text(proposal: &Proposal) -> String {
    format!(
        "⚠️ <b>Risky task proposed</b>\n\n<b>{}</b>\n\nWhy:\n{}\n\nPlan:\n{}\n\nApprove?",
        html::escape(&proposal.title),
        html::escape(&proposal.reason),
        html::escape(&proposal.plan),
    )
}

pub fn approval_keyboard(id: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ Approve", Action::Approve.payload(id))],
        vec![InlineKeyboardButton::callback("❌ Reject", Action::Reject.payload(id))],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use teloxide::types::InlineKeyboardButtonKind;

    fn proposal() -> Proposal {
        Proposal {
            id: "abc12345".into(),
            title: "Tell <everyone>".into(),
            reason: "R & R".into(),
            plan: "step".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_escapes_html() {
        let text = approval_card_text(&proposal());
        assert!(text.contains("<b>Tell &lt;everyone&gt;</b>"));
        assert!(text.contains("R &amp; R"));
        assert!(text.ends_with("Approve?"));
    }

    #[test]
    fn test_keyboard_payloads() {
        let keyboard = approval_keyboard("abc12345");
        let payloads: Vec<String> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(payloads, vec!["approve:abc12345", "reject:abc12345"]);
    }
}
