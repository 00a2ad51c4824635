use std::sync::Arc;

use aptbot_core::{config::Config, registry::RegistryStore};
use aptbot_store::SqliteRegistry;

#[tokio::main]
async fn main() -> Result<(), aptbot_core::Error> {
    let cfg = Arc::new(Config::load()?);
    aptbot_core::logging::init("aptbot", cfg.log_dir.as_deref())?;

    // Store failures at boot are fatal: without the registry no command
    // handler can do useful work.
    let store: Arc<dyn RegistryStore> = Arc::new(SqliteRegistry::open(&cfg.database_path)?);

    aptbot_telegram::router::run_webhook(cfg, store).await
}
