//! Bridge error types and their HTTP mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calbridge_core::TimeError;
use calbridge_protocol::{ErrorCode, ErrorResponse};
use calbridge_providers::ProviderError;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while serving a request or starting up.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or invalid startup configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed body, missing field or unparseable date string.
    #[error("{0}")]
    Validation(String),

    /// The calendar store failed or refused the operation.
    #[error("{0}")]
    UpstreamUnavailable(#[from] ProviderError),

    /// No stored event with the requested UID.
    #[error("Event not found")]
    NotFound,

    /// Listener or socket failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::Validation(_) => ErrorCode::InvalidRequest,
            Self::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            Self::NotFound => ErrorCode::NotFound,
            Self::Io(_) => ErrorCode::InternalError,
        }
    }
}

impl From<TimeError> for BridgeError {
    fn from(err: TimeError) -> Self {
        match err {
            TimeError::UnknownTimezone(_) => Self::Configuration(err.to_string()),
            TimeError::InvalidDateTime { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for BridgeError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::UpstreamUnavailable(e) => {
                warn!(
                    code = %e.code(),
                    provider = e.provider().unwrap_or(""),
                    error = %e,
                    "Calendar store failure"
                );
            }
            Self::Configuration(message) => warn!(error = %message, "Configuration error"),
            _ => debug!(status = %status, error = %self, "Request failed"),
        }
        let body = ErrorResponse::new(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calbridge_core::LocalZone;
    use calbridge_providers::ProviderErrorCode;

    #[test]
    fn status_mapping() {
        assert_eq!(
            BridgeError::validation("bad").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(BridgeError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            BridgeError::from(ProviderError::network("refused")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            BridgeError::configuration("x").code(),
            ErrorCode::ConfigurationError
        );
    }

    #[test]
    fn not_found_detail() {
        assert_eq!(BridgeError::NotFound.to_string(), "Event not found");
    }

    #[test]
    fn time_errors_split_by_kind() {
        let bad_date = LocalZone::default().to_instant("tomorrow").unwrap_err();
        assert!(matches!(
            BridgeError::from(bad_date),
            BridgeError::Validation(_)
        ));

        let bad_zone = LocalZone::from_name("Mars/Olympus").unwrap_err();
        assert!(matches!(
            BridgeError::from(bad_zone),
            BridgeError::Configuration(_)
        ));
    }

    #[test]
    fn upstream_keeps_provider_error() {
        let err = BridgeError::from(
            ProviderError::calendar("No calendars found.").with_provider("caldav"),
        );
        let BridgeError::UpstreamUnavailable(inner) = &err else {
            panic!("expected upstream error");
        };
        assert_eq!(inner.code(), ProviderErrorCode::CalendarError);
        assert_eq!(
            err.to_string(),
            "[caldav] calendar_error: No calendars found."
        );
    }
}
