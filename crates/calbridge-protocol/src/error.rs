//! Protocol error types.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while reading or writing API bodies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Body is empty.
    #[error("empty body")]
    EmptyBody,

    /// Body is not valid JSON for the expected shape.
    #[error("invalid body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Decodes a JSON request or response body.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProtocolError::EmptyBody);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeleteEventRequest, OkResponse};

    #[test]
    fn empty_body_is_rejected() {
        let err = decode_body::<DeleteEventRequest>(b"  \n").unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyBody));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let err = decode_body::<DeleteEventRequest>(br#"{"id":"x"}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid body:"));
    }

    #[test]
    fn decodes_ok_body() {
        let back: OkResponse = decode_body(br#"{"ok":true}"#).unwrap();
        assert!(back.ok);
    }
}
