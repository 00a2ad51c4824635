//! One handler per supported command.
//!
//! Handlers are stateless: validation first (no store access on bad input),
//! then the registry call, then the reply. Store failures are logged with a
//! stage label and answered with the generic failure message only.

use crate::batch::build_messages;
use crate::dispatch::AppContext;
use crate::domain::ChatId;
use crate::errors::Error;
use crate::messaging::types::InboundMessage;
use crate::parse::{parse_apartment, ParsedCommand};
use crate::render::{render_apartment_lines, render_contacts};
use crate::Result;

pub async fn handle_command(
    ctx: &AppContext,
    inbound: &InboundMessage,
    command: ParsedCommand,
) -> Result<()> {
    match command.name.as_str() {
        "setapt" => set_apartment(ctx, inbound, &command.args).await,
        "aptcontacts" => apartment_contacts(ctx, inbound, &command.args).await,
        "aptslist" => apartments_list(ctx, inbound).await,
        "delme" => delete_me(ctx, inbound).await,
        "start" => reply(ctx, inbound.chat_id, &ctx.catalog.start).await,
        "help" => reply(ctx, inbound.chat_id, &ctx.catalog.help).await,
        _ => reply(ctx, inbound.chat_id, &ctx.catalog.unknown).await,
    }
}

async fn set_apartment(ctx: &AppContext, inbound: &InboundMessage, args: &[String]) -> Result<()> {
    let [arg] = args else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.provide_apartment).await;
    };
    let Some(apartment) = parse_apartment(arg) else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.invalid_apartment).await;
    };
    let Some(user_id) = inbound.user_id else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.no_sender_identity).await;
    };

    let existing = match ctx.store.find_by_user(inbound.chat_id, user_id).await {
        Ok(existing) => existing,
        Err(error) => {
            return store_failure(ctx, inbound.chat_id, "find existing record", error).await
        }
    };
    if let Err(error) = ctx
        .store
        .upsert(inbound.chat_id, user_id, inbound.username.as_deref(), apartment)
        .await
    {
        return store_failure(ctx, inbound.chat_id, "upsert record", error).await;
    }

    let confirmation = match existing {
        Some(previous) if previous.apartment_number != apartment => {
            ctx.catalog.moved(previous.apartment_number, apartment)
        }
        _ => ctx.catalog.registered(apartment),
    };
    reply(ctx, inbound.chat_id, &confirmation).await
}

async fn apartment_contacts(
    ctx: &AppContext,
    inbound: &InboundMessage,
    args: &[String],
) -> Result<()> {
    let [arg] = args else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.provide_apartment).await;
    };
    let Some(apartment) = parse_apartment(arg) else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.invalid_apartment).await;
    };

    match ctx.store.find_by_apartment(inbound.chat_id, apartment).await {
        Ok(residents) if residents.is_empty() => {
            reply(ctx, inbound.chat_id, &ctx.catalog.nobody_in_apartment).await
        }
        Ok(residents) => {
            ctx.messenger
                .send_markdown(inbound.chat_id, &render_contacts(&residents))
                .await?;
            Ok(())
        }
        Err(error) => store_failure(ctx, inbound.chat_id, "find apartment contacts", error).await,
    }
}

async fn apartments_list(ctx: &AppContext, inbound: &InboundMessage) -> Result<()> {
    let Some(user_id) = inbound.user_id else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.no_sender_identity).await;
    };

    let records = match ctx.store.list_all(inbound.chat_id).await {
        Ok(records) => records,
        Err(error) => return store_failure(ctx, inbound.chat_id, "list chat records", error).await,
    };

    let chunks = if records.is_empty() {
        vec![ctx.catalog.nobody_in_chat.clone()]
    } else {
        build_messages(&render_apartment_lines(&records), ctx.message_limit)
    };

    if !ctx.gate.try_begin() {
        tracing::debug!("another batch already in flight, dropping aptslist");
        return Ok(());
    }
    ctx.notifier.spawn(user_id.private_chat(), chunks);
    Ok(())
}

async fn delete_me(ctx: &AppContext, inbound: &InboundMessage) -> Result<()> {
    let Some(user_id) = inbound.user_id else {
        return reply(ctx, inbound.chat_id, &ctx.catalog.no_sender_identity).await;
    };

    if let Err(error) = ctx.store.delete(inbound.chat_id, user_id).await {
        return store_failure(ctx, inbound.chat_id, "delete record", error).await;
    }
    reply(ctx, inbound.chat_id, &ctx.catalog.goodbye).await
}

async fn reply(ctx: &AppContext, chat_id: ChatId, text: &str) -> Result<()> {
    ctx.messenger.send_text(chat_id, text).await?;
    Ok(())
}

async fn store_failure(ctx: &AppContext, chat_id: ChatId, stage: &str, error: Error) -> Result<()> {
    tracing::error!(stage, %error, "registry query failed");
    reply(ctx, chat_id, &ctx.catalog.store_failure).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchGate, BatchNotifier, BatchState};
    use crate::catalog::MessageCatalog;
    use crate::dispatch::handle_inbound;
    use crate::domain::{ApartmentRecord, MessageId, MessageRef, Resident, UserId};
    use crate::messaging::port::MessagingPort;
    use crate::registry::RegistryStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::sleep;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<ApartmentRecord>>,
        fail: bool,
    }

    impl MemoryStore {
        fn failing() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn check(&self) -> Result<()> {
            if self.fail {
                Err(Error::Store("injected".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RegistryStore for MemoryStore {
        async fn find_by_user(
            &self,
            chat_id: ChatId,
            user_id: UserId,
        ) -> Result<Option<ApartmentRecord>> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|r| r.chat_id == chat_id && r.user_id == user_id)
                .cloned())
        }

        async fn upsert(
            &self,
            chat_id: ChatId,
            user_id: UserId,
            username: Option<&str>,
            apartment_number: u32,
        ) -> Result<()> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows
                .iter_mut()
                .find(|r| r.chat_id == chat_id && r.user_id == user_id)
            {
                row.apartment_number = apartment_number;
                row.username = username.map(|s| s.to_string());
            } else {
                rows.push(ApartmentRecord {
                    chat_id,
                    user_id,
                    username: username.map(|s| s.to_string()),
                    apartment_number,
                });
            }
            Ok(())
        }

        async fn find_by_apartment(
            &self,
            chat_id: ChatId,
            apartment_number: u32,
        ) -> Result<Vec<Resident>> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| r.chat_id == chat_id && r.apartment_number == apartment_number)
                .map(ApartmentRecord::resident)
                .collect())
        }

        async fn list_all(&self, chat_id: ChatId) -> Result<Vec<ApartmentRecord>> {
            self.check()?;
            let rows = self.rows.lock().unwrap();
            let mut out: Vec<_> = rows.iter().filter(|r| r.chat_id == chat_id).cloned().collect();
            out.sort_by_key(|r| r.apartment_number);
            Ok(out)
        }

        async fn delete(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
            self.check()?;
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| !(r.chat_id == chat_id && r.user_id == user_id));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingMessenger {
        fn texts_for(&self, chat: i64) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == chat)
                .map(|(_, t)| t.clone())
                .collect()
        }

        fn last(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessagingPort for RecordingMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id.0, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(0),
            })
        }

        async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.send_text(chat_id, text).await
        }
    }

    fn context(store: Arc<MemoryStore>) -> (AppContext, Arc<RecordingMessenger>) {
        let messenger = Arc::new(RecordingMessenger::default());
        let gate = Arc::new(BatchGate::new(Duration::from_secs(60)));
        let catalog = Arc::new(MessageCatalog::default());
        let notifier = BatchNotifier::new(
            messenger.clone(),
            gate.clone(),
            catalog.clone(),
            Duration::from_millis(20),
            CancellationToken::new(),
        );
        let ctx = AppContext {
            store,
            messenger: messenger.clone(),
            gate,
            notifier,
            catalog,
            message_limit: 4096,
        };
        (ctx, messenger)
    }

    fn from_alice(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(42),
            user_id: Some(UserId(1)),
            username: Some("alice".to_string()),
            text: text.to_string(),
        }
    }

    fn anonymous(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(42),
            user_id: None,
            username: None,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn register_update_lookup_and_delete_flow() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store.clone());

        handle_inbound(&ctx, from_alice("/setapt 5")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), ctx.catalog.registered(5));
        assert_eq!(store.rows.lock().unwrap().len(), 1);

        handle_inbound(&ctx, from_alice("/setapt 7")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), ctx.catalog.moved(5, 7));
        {
            let rows = store.rows.lock().unwrap();
            assert_eq!(rows.len(), 1, "re-registering must not add a row");
            assert_eq!(rows[0].apartment_number, 7);
        }

        handle_inbound(&ctx, from_alice("/aptcontacts 7")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), "@alice");

        handle_inbound(&ctx, from_alice("/delme")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), ctx.catalog.goodbye);
        assert!(store.rows.lock().unwrap().is_empty());

        handle_inbound(&ctx, from_alice("/aptcontacts 7")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), ctx.catalog.nobody_in_apartment);
    }

    #[tokio::test]
    async fn setapt_validation_precedes_store_access() {
        // A failing store proves validation errors never reach it.
        let store = Arc::new(MemoryStore::failing());
        let (ctx, messenger) = context(store);

        for text in ["/setapt", "/setapt abc", "/setapt 0", "/setapt 5 6"] {
            handle_inbound(&ctx, from_alice(text)).await.unwrap();
        }
        assert_eq!(
            messenger.texts_for(42),
            vec![
                ctx.catalog.provide_apartment.clone(),
                ctx.catalog.invalid_apartment.clone(),
                ctx.catalog.invalid_apartment.clone(),
                ctx.catalog.provide_apartment.clone(),
            ]
        );
    }

    #[tokio::test]
    async fn sender_identity_is_required() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, anonymous("/setapt 5")).await.unwrap();
        handle_inbound(&ctx, anonymous("/delme")).await.unwrap();
        handle_inbound(&ctx, anonymous("/aptslist")).await.unwrap();
        assert_eq!(
            messenger.texts_for(42),
            vec![
                ctx.catalog.no_sender_identity.clone(),
                ctx.catalog.no_sender_identity.clone(),
                ctx.catalog.no_sender_identity.clone(),
            ]
        );
    }

    #[tokio::test]
    async fn store_failures_reply_generically() {
        let store = Arc::new(MemoryStore::failing());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, from_alice("/setapt 5")).await.unwrap();
        handle_inbound(&ctx, from_alice("/aptcontacts 5")).await.unwrap();
        handle_inbound(&ctx, from_alice("/aptslist")).await.unwrap();
        handle_inbound(&ctx, from_alice("/delme")).await.unwrap();
        assert_eq!(
            messenger.texts_for(42),
            vec![ctx.catalog.store_failure.clone(); 4]
        );
        // No batch started, so the gate never engaged.
        assert_eq!(ctx.gate.state(), BatchState::Idle);
    }

    #[tokio::test]
    async fn unknown_input_gets_default_reply() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, from_alice("what is this bot")).await.unwrap();
        handle_inbound(&ctx, from_alice("/frobnicate")).await.unwrap();
        assert_eq!(messenger.texts_for(42), vec![ctx.catalog.unknown.clone(); 2]);
    }

    #[tokio::test]
    async fn help_and_start_are_static() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, from_alice("/start")).await.unwrap();
        handle_inbound(&ctx, from_alice("/help")).await.unwrap();
        assert_eq!(
            messenger.texts_for(42),
            vec![ctx.catalog.start.clone(), ctx.catalog.help.clone()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn aptslist_delivers_privately_and_suppresses_dispatch() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, from_alice("/setapt 5")).await.unwrap();
        let before = messenger.count();

        handle_inbound(&ctx, from_alice("/aptslist")).await.unwrap();
        assert!(ctx.gate.is_sending());

        // Commands arriving mid-batch are dropped without a reply.
        handle_inbound(&ctx, from_alice("/help")).await.unwrap();
        assert_eq!(messenger.count(), before, "mid-batch update must be dropped");

        while ctx.gate.is_sending() {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(messenger.texts_for(1), vec!["apt 5: @alice".to_string()]);

        // Dispatch resumes once the batch concludes.
        handle_inbound(&ctx, from_alice("/help")).await.unwrap();
        assert_eq!(messenger.last().unwrap(), ctx.catalog.help);
    }

    #[tokio::test(start_paused = true)]
    async fn aptslist_on_empty_chat_sends_single_notice() {
        let store = Arc::new(MemoryStore::default());
        let (ctx, messenger) = context(store);

        handle_inbound(&ctx, from_alice("/aptslist")).await.unwrap();
        while ctx.gate.is_sending() {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(messenger.texts_for(1), vec![ctx.catalog.nobody_in_chat.clone()]);
    }
}
