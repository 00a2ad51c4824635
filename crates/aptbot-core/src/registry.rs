use async_trait::async_trait;

use crate::{
    domain::{ApartmentRecord, ChatId, Resident, UserId},
    Result,
};

/// Persistence port for the per-chat apartment registry.
///
/// Implementations must make `upsert` atomic per (chat, user): duplicate
/// webhook deliveries for the same sender must never produce two rows.
/// All failures surface as `Error::Store`; handlers translate them into the
/// generic failure reply without leaking detail into the chat.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn find_by_user(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Option<ApartmentRecord>>;

    /// Insert the record, or overwrite apartment number and username of the
    /// existing row for this (chat, user).
    async fn upsert(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        username: Option<&str>,
        apartment_number: u32,
    ) -> Result<()>;

    /// Residents of one apartment, in registration order.
    async fn find_by_apartment(
        &self,
        chat_id: ChatId,
        apartment_number: u32,
    ) -> Result<Vec<Resident>>;

    /// Every record of a chat, ordered by apartment number ascending.
    async fn list_all(&self, chat_id: ChatId) -> Result<Vec<ApartmentRecord>>;

    /// Remove a resident's record. Not an error when no record exists.
    async fn delete(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;
}
