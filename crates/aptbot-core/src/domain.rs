/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One registry row: which apartment a chat member lives in.
///
/// Keyed on (chat_id, user_id); the username is display-only and may be
/// absent or stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApartmentRecord {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub apartment_number: u32,
}

/// Projection of a record used when rendering an apartment's contacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resident {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl ApartmentRecord {
    pub fn resident(&self) -> Resident {
        Resident {
            user_id: self.user_id,
            username: self.username.clone(),
        }
    }
}

impl UserId {
    /// The private chat a user shares with the bot has the user's own id.
    pub fn private_chat(self) -> ChatId {
        ChatId(self.0)
    }
}
