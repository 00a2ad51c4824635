//! Webhook ingress.
//!
//! Telegram retries updates aggressively on non-200 responses, so the
//! endpoint acknowledges every request with `200 "ok"`; failures are logged
//! and never surfaced to the platform.

use std::sync::Arc;

use axum::{extract::State, routing::post, Router};
use teloxide::types::{Update, UpdateKind};
use tracing::{debug, warn};

use aptbot_core::{
    dispatch,
    domain::{ChatId, UserId},
    messaging::types::InboundMessage,
};

use crate::router::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let path = state.cfg.webhook_path.clone();
    Router::new()
        .route(&path, post(receive_update))
        .with_state(state)
}

async fn receive_update(State(state): State<Arc<AppState>>, body: String) -> &'static str {
    match serde_json::from_str::<Update>(&body) {
        Ok(update) => match extract_inbound(&update) {
            Some(inbound) => {
                if let Err(error) = dispatch::handle_inbound(&state.ctx, inbound).await {
                    warn!(%error, "update handling failed");
                }
            }
            None => debug!("ignoring update without message text"),
        },
        Err(error) => warn!(%error, "malformed webhook body"),
    }
    "ok"
}

/// Pull the fields the dispatcher needs out of a raw Telegram update.
/// Non-message updates and messages without text carry no command.
fn extract_inbound(update: &Update) -> Option<InboundMessage> {
    let UpdateKind::Message(message) = &update.kind else {
        return None;
    };
    let text = message.text()?;

    Some(InboundMessage {
        chat_id: ChatId(message.chat.id.0),
        user_id: message.from().map(|u| UserId(u.id.0 as i64)),
        username: message.from().and_then(|u| u.username.clone()),
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_text_message_fields() {
        let u = update(
            r#"{
                "update_id": 1,
                "message": {
                    "message_id": 2,
                    "date": 0,
                    "chat": {"id": 42, "type": "group", "title": "building"},
                    "from": {"id": 7, "is_bot": false, "first_name": "Alice", "username": "alice"},
                    "text": "/setapt 5"
                }
            }"#,
        );

        let inbound = extract_inbound(&u).unwrap();
        assert_eq!(inbound.chat_id, ChatId(42));
        assert_eq!(inbound.user_id, Some(UserId(7)));
        assert_eq!(inbound.username.as_deref(), Some("alice"));
        assert_eq!(inbound.text, "/setapt 5");
    }

    #[test]
    fn message_without_text_is_ignored() {
        let u = update(
            r#"{
                "update_id": 1,
                "message": {
                    "message_id": 2,
                    "date": 0,
                    "chat": {"id": 42, "type": "group", "title": "building"},
                    "from": {"id": 7, "is_bot": false, "first_name": "Alice"},
                    "new_chat_title": "renamed"
                }
            }"#,
        );
        assert!(extract_inbound(&u).is_none());
    }

    #[test]
    fn username_is_optional() {
        let u = update(
            r#"{
                "update_id": 1,
                "message": {
                    "message_id": 2,
                    "date": 0,
                    "chat": {"id": 42, "type": "group", "title": "building"},
                    "from": {"id": 7, "is_bot": false, "first_name": "Alice"},
                    "text": "/delme"
                }
            }"#,
        );

        let inbound = extract_inbound(&u).unwrap();
        assert_eq!(inbound.user_id, Some(UserId(7)));
        assert!(inbound.username.is_none());
    }
}
