//! Global logging setup on `tracing-subscriber`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// Errors raised while installing the subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    /// The filter directive could not be parsed.
    #[error("invalid log directive: {0}")]
    InvalidDirective(#[from] tracing_subscriber::filter::ParseError),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub directive: String,
    /// Include the event target.
    pub with_target: bool,
    /// Emit an event when a span closes, with its duration.
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            directive: "info".to_string(),
            with_target: true,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for local development: human output, debug level.
    pub fn development() -> Self {
        Self::default()
            .with_format(LogFormat::Human)
            .with_directive("debug")
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the fallback filter directive.
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    /// Include or omit the event target.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Enable or disable span close events.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Filter from the configured directive, ignoring `RUST_LOG`.
    pub fn directive_filter(&self) -> Result<EnvFilter, LoggingError> {
        Ok(EnvFilter::try_new(&self.directive)?)
    }

    /// Filter from `RUST_LOG`, falling back to the configured directive.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => self.directive_filter(),
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install the global subscriber.
///
/// Returns [`LoggingError::AlreadyInitialized`] if one is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = config.filter()?;

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .with_span_events(config.fmt_span())
            .try_init(),
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .with_span_events(config.fmt_span())
            .try_init(),
    };

    result.map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive, "info");
        assert!(config.with_target);
        assert!(!config.span_events);
    }

    #[test]
    fn test_log_config_builder_chain() {
        let config = LogConfig::new()
            .with_format(LogFormat::Human)
            .with_directive("router_loader=trace")
            .with_target(false)
            .with_span_events(true);

        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(config.directive, "router_loader=trace");
        assert!(!config.with_target);
        assert!(config.span_events);
    }

    #[test]
    fn test_development_preset() {
        let config = LogConfig::development();

        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(config.directive, "debug");
    }

    #[test]
    fn test_log_config_from_json() {
        let config: LogConfig = serde_json::from_str(r#"{"format": "human"}"#).unwrap();

        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(config.directive, "info");
    }

    #[test]
    fn test_directive_filter_rejects_bad_level() {
        let config = LogConfig::new().with_directive("turbo_router=loud");

        assert!(matches!(
            config.directive_filter(),
            Err(LoggingError::InvalidDirective(_))
        ));
        assert!(LogConfig::new().directive_filter().is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::new();
        let _ = init_logging(&config);

        assert!(matches!(
            init_logging(&config),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
