//! Core types: time normalization, event records, iCalendar codec

pub mod event;
pub mod ics;
pub mod time;
pub mod tracing;

pub use event::{DecodedEvent, NewEvent};
pub use ics::{EncodedEvent, PRODUCT_ID, decode_object, encode_event, event_span, first_uid};
pub use time::{LocalZone, TimeError, TimeWindow, parse_range_bound};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
