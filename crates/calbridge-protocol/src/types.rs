//! Request and response bodies of the HTTP API.
//!
//! Field names are part of the public contract and must not change.

use calbridge_core::DecodedEvent;
use serde::{Deserialize, Serialize};

/// Body of `POST /get_events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Range start, ISO-8601 with offset or `Z`.
    pub start_iso: String,
    /// Range end, ISO-8601 with offset or `Z`.
    pub end_iso: String,
}

impl RangeQuery {
    pub fn new(start_iso: impl Into<String>, end_iso: impl Into<String>) -> Self {
        Self {
            start_iso: start_iso.into(),
            end_iso: end_iso.into(),
        }
    }
}

/// Body of `POST /create_event`.
///
/// `start_local` and `end_local` carry no offset; they are read in the
/// bridge's configured zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub start_local: String,
    pub end_local: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateEventRequest {
    pub fn new(
        title: impl Into<String>,
        start_local: impl Into<String>,
        end_local: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            start_local: start_local.into(),
            end_local: end_local.into(),
            location: None,
            description: None,
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Body of `POST /delete_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEventRequest {
    pub uid: String,
}

/// Response of `POST /get_events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<DecodedEvent>,
}

/// Response of `POST /create_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub ok: bool,
    pub uid: String,
}

impl CreatedResponse {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            ok: true,
            uid: uid.into(),
        }
    }
}

/// Plain acknowledgement, used by `/health` and `/delete_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Error codes carried next to the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown or internal error.
    InternalError,
    /// Malformed body, missing field or unparseable date.
    InvalidRequest,
    /// The remote calendar store could not serve the request.
    UpstreamUnavailable,
    /// Requested event not found.
    NotFound,
    /// Startup configuration is missing or invalid.
    ConfigurationError,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InternalError => "An internal error occurred",
            Self::InvalidRequest => "The request was invalid",
            Self::UpstreamUnavailable => "The calendar store is unavailable",
            Self::NotFound => "Requested resource not found",
            Self::ConfigurationError => "The bridge is misconfigured",
        }
    }
}

/// Error body returned with every non-2xx status.
///
/// `detail` keeps the shape existing clients already parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: ErrorCode,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code,
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.detail)
    }
}

impl std::error::Error for ErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_query_accepts_zulu_strings() {
        let query: RangeQuery = serde_json::from_str(
            r#"{"start_iso":"2025-08-01T00:00:00Z","end_iso":"2025-08-31T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            query,
            RangeQuery::new("2025-08-01T00:00:00Z", "2025-08-31T00:00:00Z")
        );
    }

    #[test]
    fn create_request_optional_fields() {
        let minimal: CreateEventRequest = serde_json::from_str(
            r#"{"title":"Standup","start_local":"2025-08-10T09:00","end_local":"2025-08-10T09:15"}"#,
        )
        .unwrap();
        assert_eq!(
            minimal,
            CreateEventRequest::new("Standup", "2025-08-10T09:00", "2025-08-10T09:15")
        );

        let full: CreateEventRequest = serde_json::from_str(
            r#"{"title":"Standup","start_local":"2025-08-10T09:00","end_local":"2025-08-10T09:15",
                "location":"Room 4","description":null,"extra":1}"#,
        )
        .unwrap();
        assert_eq!(full.location.as_deref(), Some("Room 4"));
        assert_eq!(full.description, None);
    }

    #[test]
    fn create_request_missing_title_is_rejected() {
        let err = serde_json::from_str::<CreateEventRequest>(
            r#"{"start_local":"2025-08-10T09:00","end_local":"2025-08-10T09:15"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing field `title`"));
    }

    #[test]
    fn events_response_shape() {
        let response = EventsResponse {
            events: vec![
                DecodedEvent {
                    uid: Some("a@calendar-bridge".into()),
                    summary: Some("Standup".into()),
                    start: Some("2025-08-10T09:00:00-05:00".into()),
                    end: Some("2025-08-10T09:15:00-05:00".into()),
                },
                DecodedEvent {
                    uid: Some("b@example.com".into()),
                    ..Default::default()
                },
            ],
        };
        insta::assert_json_snapshot!(response, @r#"
        {
          "events": [
            {
              "uid": "a@calendar-bridge",
              "summary": "Standup",
              "start": "2025-08-10T09:00:00-05:00",
              "end": "2025-08-10T09:15:00-05:00"
            },
            {
              "uid": "b@example.com",
              "summary": null,
              "start": null,
              "end": null
            }
          ]
        }
        "#);
    }

    #[test]
    fn created_response_shape() {
        insta::assert_json_snapshot!(CreatedResponse::new("abc@calendar-bridge"), @r#"
        {
          "ok": true,
          "uid": "abc@calendar-bridge"
        }
        "#);
    }

    #[test]
    fn ok_response_shape() {
        let json = serde_json::to_string(&OkResponse::ok()).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }

    #[test]
    fn error_response_shape() {
        let error = ErrorResponse::new(ErrorCode::NotFound, "Event not found");
        insta::assert_json_snapshot!(error, @r#"
        {
          "detail": "Event not found",
          "code": "not_found"
        }
        "#);
        assert_eq!(
            error.to_string(),
            "Requested resource not found: Event not found"
        );
    }

    #[test]
    fn error_code_serde() {
        let json = serde_json::to_string(&ErrorCode::UpstreamUnavailable).unwrap();
        assert_eq!(json, r#""upstream_unavailable""#);
        let parsed: ErrorCode = serde_json::from_str(r#""invalid_request""#).unwrap();
        assert_eq!(parsed, ErrorCode::InvalidRequest);
    }
}
