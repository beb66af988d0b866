//! Tracing setup for the jellify binary
//!
//! Everything is written to a log file that rolls over daily, leaving
//! stdout to the command output.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "jellify";
const DEFAULT_DIRECTIVES: &str = "jellify_core=debug,jellify=debug,reqwest=info,warn";

/// Install the global subscriber, writing to `<dir>/jellify.YYYY-MM-DD`.
///
/// `RUST_LOG` replaces the default directives when set. Buffered lines are
/// flushed when the returned guard drops, so keep it alive in `main`.
pub fn init_logging(dir: impl AsRef<Path>) -> anyhow::Result<WorkerGuard> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    tracing::info!(dir = %dir.display(), "Log file opened");
    Ok(guard)
}

/// Record the outcome of a Jellyfin endpoint call.
///
/// Failures are logged at warn: the caller decides whether they reach the
/// user as a notice.
#[macro_export]
macro_rules! log_server_outcome {
    ($endpoint:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::debug!(endpoint = $endpoint, "Jellyfin responded"),
            Err(e) => tracing::warn!(endpoint = $endpoint, error = %e, "Jellyfin call failed"),
        }
    };
}

/// Record an outgoing Jellyfin endpoint call with its parameters
#[macro_export]
macro_rules! log_server_call {
    ($endpoint:expr, $($field:tt)*) => {
        tracing::debug!(endpoint = $endpoint, $($field)*, "Calling Jellyfin");
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn outcome_macro_handles_both_arms() {
        let ok: anyhow::Result<u8> = Ok(1);
        let err: anyhow::Result<u8> = Err(anyhow::anyhow!("timed out"));
        log_server_outcome!("fetch_genres", ok);
        log_server_outcome!("fetch_genres", err);
        let page = 3;
        log_server_call!("fetch_genres", page);
    }
}
