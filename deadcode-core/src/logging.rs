//! Logging for the emitter and collector binaries
//!
//! Both binaries log to one daily-rotated file under the XDG state directory,
//! `~/.local/state/deadcode/deadcode.log.<date>`. The level comes from, in order:
//! `DEADCODE_LOG`, `RUST_LOG`, then `[logging] level` in config.toml.
//! `DEADCODE_LOG` sets the level independently of a host process's `RUST_LOG`.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Environment variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "DEADCODE_LOG";

/// Install the global subscriber.
///
/// `echo_stderr` mirrors every event to stderr in compact form (the `-v` flag).
/// Fails on an unparsable configured level instead of silently logging nothing.
pub fn init(config: &LoggingConfig, echo_stderr: bool) -> Result<LoggingGuard> {
    let filter = build_filter(config)?;

    let path = log_file_path();
    let (log_dir, prefix) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_owned()),
        _ => {
            return Err(Error::Config(format!(
                "invalid log file path: {}",
                path.display()
            )))
        }
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, prefix);

    // The collector logs from the receive loop, keep writes off that thread
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = echo_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(
        log_file = %path.display(),
        level = %config.level,
        echo_stderr,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Level filter from the environment, falling back to the configured level
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    for var in [LOG_ENV, EnvFilter::DEFAULT_ENV] {
        if let Ok(filter) = EnvFilter::try_from_env(var) {
            return Ok(filter);
        }
    }

    EnvFilter::try_new(&config.level).map_err(|e| {
        Error::Config(format!("invalid logging level {:?}: {}", config.level, e))
    })
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env(LOG_ENV))
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the background log writer alive; pending lines are flushed on drop
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Base path of the log file. The rolling appender adds a `.<date>` suffix.
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path();
        assert!(path.ends_with("deadcode/deadcode.log"));
        assert_eq!(path.parent(), Some(Config::state_dir().as_path()));
    }

    #[test]
    fn test_configured_level_is_validated() {
        // Only meaningful when the environment does not override the level
        if std::env::var_os(LOG_ENV).is_some() || std::env::var_os("RUST_LOG").is_some() {
            return;
        }

        let ok = LoggingConfig {
            level: "debug,deadcode_core=trace".to_string(),
        };
        assert!(build_filter(&ok).is_ok());

        let bad = LoggingConfig {
            level: "deadcode_core=loudest".to_string(),
        };
        match build_filter(&bad) {
            Err(Error::Config(message)) => assert!(message.contains("loudest")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
