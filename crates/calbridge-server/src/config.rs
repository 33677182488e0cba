//! Bridge configuration.
//!
//! Built once at startup from the command line and environment, then handed
//! to the store and the service. Nothing reads the environment afterwards.

use std::net::SocketAddr;
use std::time::Duration;

use calbridge_core::{LocalZone, TracingConfig, TracingOutputFormat};
use calbridge_providers::caldav::CalDavConfig;
use tracing::Level;

use crate::cli::Cli;
use crate::error::{BridgeError, BridgeResult};

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub caldav: CalDavConfig,
    pub zone: LocalZone,
    pub bind: SocketAddr,
    pub tracing: TracingConfig,
}

impl BridgeConfig {
    /// Validates the parsed command line.
    ///
    /// Missing credentials, a malformed URL, an unknown zone or an unknown
    /// log format are configuration errors.
    pub fn from_cli(cli: &Cli) -> BridgeResult<Self> {
        let username = required(cli.username.as_deref(), "ICLOUD_USERNAME")?;
        let password = required(cli.password.as_deref(), "ICLOUD_APP_PW")?;

        let mut caldav = CalDavConfig::new(&cli.caldav_url)
            .map_err(|e| {
                BridgeError::configuration(format!("invalid CALDAV_URL '{}': {e}", cli.caldav_url))
            })?
            .with_credentials(username, password)
            .with_timeout(Duration::from_secs(cli.timeout));
        if cli.insecure {
            caldav = caldav.with_insecure_tls();
        }

        let zone = LocalZone::from_name(&cli.timezone)?;

        let format: TracingOutputFormat = cli
            .log_format
            .parse()
            .map_err(BridgeError::configuration)?;
        let tracing = if cli.debug {
            TracingConfig::debug()
        } else {
            TracingConfig::server().with_level(Level::INFO)
        }
        .with_format(format);

        Ok(Self {
            caldav,
            zone,
            bind: cli.bind,
            tracing,
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> BridgeResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BridgeError::configuration(format!("{name} is required")))
}
