//! CalDAV calendar store.
//!
//! - Basic and Digest authentication
//! - principal, calendar-home-set and collection discovery via PROPFIND
//! - calendar-query REPORT with optional server-side recurrence expansion
//! - conditional PUT and DELETE for object writes
//!
//! # Example
//!
//! ```ignore
//! use calbridge_providers::caldav::{CalDavConfig, CalDavStore};
//!
//! let config = CalDavConfig::new(CalDavConfig::DEFAULT_URL)?.with_credentials("me@icloud.com", "app-password");
//! let store = CalDavStore::new(config)?;
//! let objects = store.search(window, true).await?;
//! ```

mod auth;
mod client;
mod config;
mod store;
mod xml;

pub use auth::Credentials;
pub use config::CalDavConfig;
pub use store::CalDavStore;
