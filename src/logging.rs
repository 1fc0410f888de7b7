//! Logging setup.
//!
//! Standard output carries command data, so logs never go there. An
//! interactive run logs to a rolling file so the terminal (and the grid
//! viewer drawn on it) stays clean; scripted runs log to the systemd journal
//! on Linux, or to stderr where there is no journal.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log records end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    Stderr,
    File,
}

/// Pick a target from how the process was started.
pub fn choose_target(stderr_is_terminal: bool, journald_available: bool) -> LogTarget {
    match (stderr_is_terminal, journald_available) {
        (true, _) => LogTarget::File,
        (false, true) => LogTarget::Journald,
        (false, false) => LogTarget::Stderr,
    }
}

/// Initialize the logging system.
///
/// Log level is read from `CATALOG_EMBED_LOG` (`debug`, `info`, `warn`,
/// `error`), defaulting to `info`. `log_dir` is used for the file target.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("CATALOG_EMBED_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    let journald_layer = tracing_journald::layer().ok();
    #[cfg(target_os = "linux")]
    let journald_available = journald_layer.is_some();
    #[cfg(not(target_os = "linux"))]
    let journald_available = false;

    let target = choose_target(std::io::stderr().is_terminal(), journald_available);
    match target {
        #[cfg(target_os = "linux")]
        LogTarget::Journald => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .init();
        }
        #[cfg(not(target_os = "linux"))]
        LogTarget::Journald => unreachable!("journald is Linux-only"),
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
                .init();
        }
        LogTarget::File => {
            let log_dir = log_dir.unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("catalog-embed")
                    .join("logs")
            });
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = tracing_appender::rolling::daily(&log_dir, "catalog-embed.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The writer flushes on drop, so the guard must outlive main.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
    }

    tracing::debug!(?target, "Logging initialized");
    Ok(())
}
