//! Error types for calendar store operations.

use std::fmt;
use thiserror::Error;

/// The category of a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials were rejected.
    AuthenticationFailed,
    /// Credentials are valid but lack permission.
    AuthorizationFailed,
    /// Connection failed, timed out, DNS resolution, etc.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// Response could not be understood.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Server refused the request as malformed (400).
    BadRequest,
    /// A conditional request failed (412), e.g. the resource already exists.
    PreconditionFailed,
    /// Missing or invalid store configuration.
    ConfigurationError,
    /// No usable calendar collection, or the calendar refused the operation.
    CalendarError,
    /// Unexpected internal state.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::PreconditionFailed => "precondition_failed",
            Self::ConfigurationError => "configuration_error",
            Self::CalendarError => "calendar_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::AuthenticationFailed,
            403 => Self::AuthorizationFailed,
            404 | 410 => Self::NotFound,
            412 => Self::PreconditionFailed,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::InvalidResponse,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while talking to the calendar store.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Store that produced the error ("caldav", "memory").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn calendar(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CalendarError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Error for an HTTP response the store did not accept.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::from_status(status), message)
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Copies code, message and provider; the source chain is not kept.
    pub fn duplicate(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            provider: self.provider.clone(),
            source: None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for store operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
