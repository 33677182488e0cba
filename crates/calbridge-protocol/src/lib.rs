//! Wire types of the calbridge HTTP API.
//!
//! | route | request | response |
//! |---|---|---|
//! | `GET /health` | | [`OkResponse`] |
//! | `POST /get_events` | [`RangeQuery`] | [`EventsResponse`] |
//! | `POST /create_event` | [`CreateEventRequest`] | [`CreatedResponse`] |
//! | `POST /delete_event` | [`DeleteEventRequest`] | [`OkResponse`] |
//!
//! Failures carry an [`ErrorResponse`] body.
//!
//! ```rust
//! use calbridge_protocol::{decode_body, RangeQuery};
//!
//! let query: RangeQuery =
//!     decode_body(br#"{"start_iso":"2025-08-01T00:00:00Z","end_iso":"2025-08-02T00:00:00Z"}"#)
//!         .unwrap();
//! assert_eq!(query.start_iso, "2025-08-01T00:00:00Z");
//! ```

mod error;
mod types;

pub use error::{ProtocolError, ProtocolResult, decode_body};
pub use types::{
    CreateEventRequest, CreatedResponse, DeleteEventRequest, ErrorCode, ErrorResponse,
    EventsResponse, OkResponse, RangeQuery,
};
