use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound-messaging port.
///
/// Telegram is the first implementation. Handlers and the batch notifier only
/// ever talk to this trait, which keeps them testable with a recording fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain-text send.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Markdown send, used where contact mentions must stay clickable.
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
