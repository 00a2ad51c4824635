//! App wiring: state construction and the webhook server loop.

use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

use aptbot_core::{
    batch::{BatchGate, BatchNotifier},
    catalog::MessageCatalog,
    config::Config,
    dispatch::AppContext,
    errors::Error,
    messaging::port::MessagingPort,
    registry::RegistryStore,
    Result,
};

use crate::{webhook, TelegramMessenger};

pub struct AppState {
    pub cfg: Arc<Config>,
    pub ctx: AppContext,
}

/// Build the app state and serve the webhook until ctrl-c.
///
/// Shutdown cancels the batch worker before the HTTP server stops accepting
/// connections, so a mid-flight listing ends cleanly instead of holding the
/// gate.
pub async fn run_webhook(cfg: Arc<Config>, store: Arc<dyn RegistryStore>) -> Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("aptbot started: @{}", me.username());
    }

    if let Some(url) = &cfg.webhook_url {
        let url = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid WEBHOOK_URL: {e}")))?;
        bot.set_webhook(url)
            .await
            .map_err(|e| Error::Transport(format!("set_webhook failed: {e}")))?;
        info!("webhook registered with Telegram");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot));
    let catalog = Arc::new(MessageCatalog::default());
    let gate = Arc::new(BatchGate::new(cfg.batch_gate_timeout));
    let shutdown = CancellationToken::new();
    let notifier = BatchNotifier::new(
        messenger.clone(),
        gate.clone(),
        catalog.clone(),
        cfg.batch_send_delay,
        shutdown.clone(),
    );

    let ctx = AppContext {
        store,
        messenger,
        gate,
        notifier,
        catalog,
        message_limit: cfg.message_limit,
    };
    let state = Arc::new(AppState { cfg: cfg.clone(), ctx });

    let app = webhook::app(state);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    info!(
        "listening on {} (webhook path {}, database {})",
        cfg.bind_addr,
        cfg.webhook_path,
        cfg.database_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
    shutdown.cancel();
}
