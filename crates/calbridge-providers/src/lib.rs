//! Calendar stores: where events live.
//!
//! - [`CalendarStore`] - the operations the bridge needs from a calendar
//! - [`caldav::CalDavStore`] - a CalDAV server such as iCloud
//! - [`MemoryStore`] - an in-process calendar
//! - [`ProviderError`] - failures, classified by [`ProviderErrorCode`]
//!
//! ```text
//! ┌────────────────┐      ┌─────────────────┐
//! │  EventService  │─────▶│  CalendarStore  │
//! └────────────────┘      └────────┬────────┘
//!                        ┌─────────┴─────────┐
//!                        ▼                   ▼
//!                 ┌─────────────┐     ┌─────────────┐
//!                 │ CalDavStore │     │ MemoryStore │
//!                 └──────┬──────┘     └─────────────┘
//!                        ▼
//!                 CalDAV server
//! ```

#[cfg(feature = "caldav")]
pub mod caldav;
pub mod error;
pub mod memory;
pub mod store;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::MemoryStore;
pub use store::{BoxFuture, CalendarObject, CalendarStore, ErrorStore};
