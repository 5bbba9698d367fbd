//! Logging setup
//!
//! Installs the global `tracing` subscriber. The filter comes from `RUST_LOG`
//! when set, otherwise from [`LoggingConfig::default_directive`].

use tracing_subscriber::EnvFilter;

use marionette_core::{MarionetteError, MarionetteResult};

/// Output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "compact" | "text" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset, e.g. `marionette=debug`
    pub default_directive: String,
    /// Include event targets in the output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            format: LogFormat::Compact,
            default_directive: "info".to_string(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Read `MARIONETTE_LOG_FORMAT`, starting from defaults
    pub fn from_env() -> MarionetteResult<Self> {
        let mut config = LoggingConfig::default();
        if let Ok(raw) = std::env::var("MARIONETTE_LOG_FORMAT") {
            config.format = LogFormat::parse(&raw)
                .ok_or_else(|| MarionetteError::InvalidConfig(format!("unknown log format: {raw}")))?;
        }
        Ok(config)
    }

    fn filter(&self) -> MarionetteResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.default_directive)
                .map_err(|e| MarionetteError::InvalidConfig(format!("log filter: {e}"))),
        }
    }
}

/// Install the global subscriber
///
/// Fails with `InvalidConfig` if a subscriber is already installed or the
/// default directive does not parse.
pub fn init_logging(config: &LoggingConfig) -> MarionetteResult<()> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| MarionetteError::InvalidConfig(format!("logging already initialised: {e}")))
}
