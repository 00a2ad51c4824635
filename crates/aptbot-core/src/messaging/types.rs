use crate::domain::{ChatId, UserId};

/// Messenger-agnostic incoming text update.
///
/// Telegram-specific fields stay in the Telegram adapter; the dispatcher only
/// needs the chat, the sender (when resolvable) and the raw text.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub text: String,
}
