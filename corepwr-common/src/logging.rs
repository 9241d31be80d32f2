//! Logging bootstrap shared by the sensor binary and test harnesses.

use thiserror::Error;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Raised when a process tries to install a second global subscriber.
#[derive(Debug, Error)]
#[error("failed to install the global tracing subscriber: {0}")]
pub struct LoggingInitError(#[from] tracing_subscriber::util::TryInitError);

/// How the process-wide subscriber should be built.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    stderr: bool,
}

impl LogConfig {
    /// Level comes from `COREPWR_LOG` when set, else `default_level`;
    /// `RUST_LOG` still wins at filter-construction time.
    pub fn from_env(default_level: &str) -> Self {
        let level = std::env::var("COREPWR_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_level.to_string());
        Self {
            level,
            stderr: false,
        }
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    /// Route diagnostics to stderr so record output on stdout stays clean.
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }
}

/// Install the global subscriber. Errors if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level()));

    let fmt_layer = if config.stderr {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;
    Ok(())
}
