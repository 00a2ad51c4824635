use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, read from the environment (with `.env` honored).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub database_path: PathBuf,

    // Webhook ingress
    pub bind_addr: SocketAddr,
    pub webhook_path: String,
    /// Public URL to register with Telegram at startup. When unset the
    /// webhook is assumed to be registered out of band.
    pub webhook_url: Option<String>,

    // Batch delivery
    pub message_limit: usize,
    pub batch_send_delay: Duration,
    pub batch_gate_timeout: Duration,

    // Logging
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let database_path = env_path("DATABASE_PATH").unwrap_or_else(|| PathBuf::from("aptbot.sqlite"));

        let bind_addr = env_str("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid BIND_ADDR: {e}")))?;

        let mut webhook_path = env_str("WEBHOOK_PATH").unwrap_or_else(|| "/webhook".to_string());
        if !webhook_path.starts_with('/') {
            webhook_path.insert(0, '/');
        }
        let webhook_url = env_str("WEBHOOK_URL").and_then(non_empty);

        let message_limit = env_usize("MESSAGE_LIMIT").unwrap_or(4096);
        let batch_send_delay =
            Duration::from_millis(env_u64("BATCH_SEND_DELAY_MS").unwrap_or(2000));
        let batch_gate_timeout =
            Duration::from_secs(env_u64("BATCH_GATE_TIMEOUT_SECS").unwrap_or(120));

        let log_dir = env_path("LOG_DIR");

        Ok(Self {
            telegram_bot_token,
            database_path,
            bind_addr,
            webhook_path,
            webhook_url,
            message_limit,
            batch_send_delay,
            batch_gate_timeout,
            log_dir,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
