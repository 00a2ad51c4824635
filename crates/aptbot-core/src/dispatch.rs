//! Inbound update dispatch: gate check, parsing, command routing.
//!
//! The parser output is passed straight into the command handler as a plain
//! value; nothing rides along on hidden per-request context.

use std::sync::Arc;

use crate::batch::{BatchGate, BatchNotifier};
use crate::catalog::MessageCatalog;
use crate::commands;
use crate::messaging::{port::MessagingPort, types::InboundMessage};
use crate::parse::parse_command;
use crate::registry::RegistryStore;
use crate::Result;

/// Everything a command handler may touch, wired once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RegistryStore>,
    pub messenger: Arc<dyn MessagingPort>,
    pub gate: Arc<BatchGate>,
    pub notifier: BatchNotifier,
    pub catalog: Arc<MessageCatalog>,
    pub message_limit: usize,
}

/// Handle one inbound text update end to end.
///
/// While a batch send is in flight the update is dropped without a reply;
/// this is deliberate and process-wide, matching the one-batch-at-a-time
/// delivery model.
pub async fn handle_inbound(ctx: &AppContext, inbound: InboundMessage) -> Result<()> {
    if ctx.gate.is_sending() {
        tracing::debug!(chat_id = inbound.chat_id.0, "batch send in flight, dropping update");
        return Ok(());
    }

    match parse_command(&inbound.text) {
        Some(command) => commands::handle_command(ctx, &inbound, command).await,
        None => {
            ctx.messenger
                .send_text(inbound.chat_id, &ctx.catalog.unknown)
                .await?;
            Ok(())
        }
    }
}
