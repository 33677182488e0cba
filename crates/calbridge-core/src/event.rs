//! Event records exchanged between the services and the codec.
//!
//! - [`NewEvent`]: a creation payload whose times are already pinned to the
//!   configured zone
//! - [`DecodedEvent`]: the simplified read shape of one stored event

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// An event about to be written to the calendar store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            location: None,
            description: None,
        }
    }

    /// Sets the location. Empty strings count as absent.
    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.is_empty());
        self
    }

    /// Sets the description. Empty strings count as absent.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    /// Name of the zone both times are expressed in.
    pub fn tzid(&self) -> &'static str {
        self.start.timezone().name()
    }
}

/// One event as read back from the store.
///
/// Every field is looked up on its own; anything the stored object lacks is
/// `None` and serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}
