/*!
 * Logging setup
 *
 * Human-readable lines go to stderr so stdout stays free for the navigation
 * screen and tables. With a log file configured, records are appended to
 * it as JSON lines instead.
 */

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};

/// Where log records end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    JsonFile(PathBuf),
}

pub fn log_target(config: &HarvestConfig) -> LogTarget {
    match config.log_file {
        Some(ref path) => LogTarget::JsonFile(path.clone()),
        None => LogTarget::Stderr,
    }
}

/// Effective level after applying the verbose shorthand
pub fn effective_level(config: &HarvestConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter covering this crate and the retry crate; suppaftp and reqwest stay quiet
pub fn filter_directive(level: Level) -> String {
    format!(
        "tdoc_harvest={level},harvest_core_resilience={level}",
        level = level.as_str().to_ascii_lowercase()
    )
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &HarvestConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(effective_level(config))))
        .map_err(|e| HarvestError::Config(format!("Invalid log filter: {}", e)))?;

    let installed = match log_target(config) {
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init(),
        LogTarget::JsonFile(path) => {
            let file = open_log_file(&path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_file(true)
                        .with_line_number(true)
                        .json(),
                )
                .try_init()
        }
    };
    installed.map_err(|e| HarvestError::Config(format!("Logging already initialized: {}", e)))
}

/// Append to the log across runs, creating missing parent folders
fn open_log_file(path: &Path) -> Result<fs::File> {
    let open_failed =
        |e: std::io::Error| HarvestError::Config(format!("Cannot open log file {}: {}", path.display(), e));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(open_failed)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_failed)
}

#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(Level::DEBUG)));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer().with_target(false).compact())
            .try_init();
    });
}
