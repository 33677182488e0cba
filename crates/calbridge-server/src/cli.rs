//! Command-line interface definition.

use std::net::SocketAddr;

use calbridge_providers::caldav::CalDavConfig;
use clap::Parser;

/// calbridge - JSON over HTTP in front of a CalDAV calendar
#[derive(Debug, Parser)]
#[command(name = "calbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// CalDAV server base URL
    #[arg(long, env = "CALDAV_URL", default_value = CalDavConfig::DEFAULT_URL)]
    pub caldav_url: String,

    /// Account name on the CalDAV server
    #[arg(long, env = "ICLOUD_USERNAME")]
    pub username: Option<String>,

    /// App-specific password for the account
    #[arg(long, env = "ICLOUD_APP_PW", hide_env_values = true)]
    pub password: Option<String>,

    /// IANA zone used to interpret local event times
    #[arg(long, env = "TIMEZONE", default_value = "America/Chicago")]
    pub timezone: String,

    /// Address to listen on
    #[arg(long, env = "CALBRIDGE_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Timeout for each CalDAV request, in seconds
    #[arg(
        long,
        env = "CALBRIDGE_TIMEOUT",
        default_value_t = CalDavConfig::DEFAULT_TIMEOUT_SECS
    )]
    pub timeout: u64,

    /// Skip TLS certificate verification
    #[arg(long, env = "CALBRIDGE_INSECURE")]
    pub insecure: bool,

    /// Log output: pretty, compact or json
    #[arg(long, env = "CALBRIDGE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "calbridge",
            "--caldav-url",
            "https://dav.example.com/",
            "--username",
            "me@example.com",
            "--password",
            "app-pw",
            "--timezone",
            "Europe/Paris",
            "--bind",
            "0.0.0.0:9000",
            "--timeout",
            "5",
            "--insecure",
            "--log-format",
            "json",
            "--debug",
        ])
        .unwrap();

        assert_eq!(cli.caldav_url, "https://dav.example.com/");
        assert_eq!(cli.username.as_deref(), Some("me@example.com"));
        assert_eq!(cli.password.as_deref(), Some("app-pw"));
        assert_eq!(cli.timezone, "Europe/Paris");
        assert_eq!(cli.bind.port(), 9000);
        assert_eq!(cli.timeout, 5);
        assert!(cli.insecure);
        assert_eq!(cli.log_format, "json");
        assert!(cli.debug);
    }

    #[test]
    fn caldav_defaults() {
        let cli = Cli::try_parse_from(["calbridge"]).unwrap();
        assert_eq!(cli.caldav_url, "https://caldav.icloud.com/");
        assert_eq!(cli.timeout, 30);
    }

    #[test]
    fn rejects_bad_bind_address() {
        assert!(Cli::try_parse_from(["calbridge", "--bind", "localhost"]).is_err());
    }
}
