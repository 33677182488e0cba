//! Tracing setup for calbridge
//!
//! ```ignore
//! use calbridge_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::server())?;
//! ```
//!
//! `RUST_LOG` overrides the default filter when set.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            )),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used for the bridge crates when RUST_LOG is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Include file/line information
    pub include_location: bool,
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Emit span open/close events
    pub include_span_events: bool,
    /// Custom env filter directive (overrides default_level if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Preset for the long-running HTTP server.
    #[must_use]
    pub fn server() -> Self {
        Self {
            output_format: TracingOutputFormat::Compact,
            ..Self::default()
        }
    }

    /// Preset for local troubleshooting: debug level with source locations.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Pretty,
            include_location: true,
            include_target: true,
            include_timestamp: true,
            include_span_events: true,
            env_filter: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directive applied when neither RUST_LOG nor a custom filter is set.
    pub fn default_directive(&self) -> String {
        format!(
            "calbridge={level},tower_http={level}",
            level = self.default_level
        )
    }
}

impl TracingConfig {
    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed or when the custom
/// filter directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let base = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target)
        .with_span_events(config.span_events());

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Pretty, _) => base.pretty().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        (TracingOutputFormat::Json, _) => base.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
