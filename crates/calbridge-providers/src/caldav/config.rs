//! CalDAV store configuration.

use std::time::Duration;
use url::Url;

/// Configuration for the CalDAV store.
#[derive(Clone)]
pub struct CalDavConfig {
    /// Server base URL; calendar discovery starts here.
    pub url: Url,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Bound on every outbound request.
    pub timeout: Duration,

    pub user_agent: String,
}

impl CalDavConfig {
    /// iCloud's CalDAV entry point.
    pub const DEFAULT_URL: &'static str = "https://caldav.icloud.com/";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given server URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url.as_ref())?;
        Ok(Self {
            url: parsed,
            username: None,
            password: None,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calbridge/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Disables TLS verification (for self-signed test servers only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for CalDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalDavConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
