use std::{fs, path::Path, sync::Mutex};

use tracing_subscriber::{fmt, EnvFilter};

use crate::Result;

/// Initialize tracing for the bot.
///
/// Default: info for our crates, warn for everything else. Can be overridden
/// with `RUST_LOG`. When `log_dir` is set, output is appended to
/// `<log_dir>/<service_name>.log` (rotation is left to the host, e.g.
/// logrotate); otherwise it goes to stderr.
pub fn init(service_name: &str, log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,aptbot=info,aptbot_core=info,aptbot_store=info,aptbot_telegram=info,{service_name}=info"
        ))
    });

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{service_name}.log")))?;
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
