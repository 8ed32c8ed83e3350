//! Process-wide `tracing` subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the filter is `finprep=<level>` with
//! the HTTP stack held at `warn`.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// How log lines are filtered and formatted.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate when `RUST_LOG` is unset.
    pub level: Level,
    /// One JSON object per line instead of human-readable text.
    pub use_json: bool,
    /// Include the module target.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration with a level.
    #[must_use]
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.use_json = true;
        self
    }

    /// The filter directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_directives(&self) -> String {
        format!(
            "finprep={},hyper=warn,reqwest=warn",
            self.level.as_str().to_lowercase()
        )
    }
}

/// Parses a level name, falling back to `INFO`.
#[must_use]
pub fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(config.default_directives())
        };

        let registry = tracing_subscriber::registry().with(filter);
        // A subscriber installed elsewhere (e.g. by a test harness) takes precedence.
        let _ = if config.use_json {
            registry
                .with(fmt::layer().json().with_target(config.include_target))
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        };
    });
}

/// Installs the default human-readable subscriber.
pub fn init_default() {
    init_logging(LoggingConfig::default());
}
