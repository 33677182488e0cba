//! Event operations on top of a [`CalendarStore`].

use std::sync::Arc;

use calbridge_core::{
    DecodedEvent, LocalZone, NewEvent, TimeWindow, decode_object, encode_event, first_uid,
    parse_range_bound,
};
use calbridge_protocol::CreateEventRequest;
use calbridge_providers::CalendarStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};

/// Days searched on each side of "now" when looking up an event to delete.
pub const DELETE_SEARCH_DAYS: i64 = 180;

/// List, create and delete events in the configured calendar.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct EventService {
    store: Arc<dyn CalendarStore>,
    zone: LocalZone,
}

impl EventService {
    pub fn new(store: Arc<dyn CalendarStore>, zone: LocalZone) -> Self {
        Self { store, zone }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Events overlapping `[start_iso, end_iso)`, recurrences expanded.
    ///
    /// Bounds are not checked against each other; an inverted range is
    /// passed to the store as-is.
    pub async fn list_events(
        &self,
        start_iso: &str,
        end_iso: &str,
    ) -> BridgeResult<Vec<DecodedEvent>> {
        let start = parse_range_bound(start_iso)?;
        let end = parse_range_bound(end_iso)?;
        let window = TimeWindow::from_bounds(&start, &end);

        let objects = self.store.search(window, true).await?;
        let events: Vec<DecodedEvent> = objects
            .iter()
            .flat_map(|object| {
                let events = decode_object(&object.data);
                if events.is_empty() {
                    warn!(href = %object.href, "Skipping object without readable events");
                }
                events
            })
            .collect();

        debug!(
            start = %window.start,
            end = %window.end,
            inverted = window.is_inverted(),
            objects = objects.len(),
            events = events.len(),
            "Listed events"
        );
        Ok(events)
    }

    /// Creates one event and returns its new UID.
    ///
    /// Not idempotent: each call stores a separate event.
    pub async fn create_event(&self, request: CreateEventRequest) -> BridgeResult<String> {
        let start = self.zone.to_instant(&request.start_local)?;
        let end = self.zone.to_instant(&request.end_local)?;

        let event = NewEvent::new(request.title, start, end)
            .with_location(request.location)
            .with_description(request.description);
        let encoded = encode_event(&event);

        let href = self.store.create(&encoded.uid, &encoded.ics).await?;
        info!(uid = %encoded.uid, href = %href, start = %event.start, "Created event");
        Ok(encoded.uid)
    }

    /// Deletes the first stored object whose event carries `uid`.
    pub async fn delete_event(&self, uid: &str) -> BridgeResult<()> {
        self.delete_event_at(uid, Utc::now()).await
    }

    /// Same as [`delete_event`](Self::delete_event), searching around `now`.
    pub async fn delete_event_at(&self, uid: &str, now: DateTime<Utc>) -> BridgeResult<()> {
        let window = TimeWindow::around(now, DELETE_SEARCH_DAYS);
        let objects = self.store.search(window, false).await?;

        let Some(object) = objects
            .iter()
            .find(|object| first_uid(&object.data).as_deref() == Some(uid))
        else {
            debug!(uid = %uid, searched = objects.len(), "No event with this UID");
            return Err(BridgeError::NotFound);
        };

        self.store.delete(object).await?;
        info!(uid = %uid, href = %object.href, "Deleted event");
        Ok(())
    }
}
