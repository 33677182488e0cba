//! In-process [`CalendarStore`], used by tests and local runs without a server.

use calbridge_core::{TimeWindow, event_span};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::store::{BoxFuture, CalendarObject, CalendarStore};

const COLLECTION: &str = "/calendars/memory/";

/// A single calendar held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<CalendarObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `objects`.
    pub fn with_objects(objects: impl IntoIterator<Item = CalendarObject>) -> Self {
        Self {
            objects: Mutex::new(objects.into_iter().collect()),
        }
    }

    /// Copy of everything currently stored.
    pub async fn objects(&self) -> Vec<CalendarObject> {
        self.objects.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

impl CalendarStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn search(
        &self,
        window: TimeWindow,
        _expand: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarObject>>> {
        Box::pin(async move {
            let objects = self.objects.lock().await;
            Ok(objects
                .iter()
                .filter(|object| {
                    event_span(&object.data).is_some_and(|(start, end)| window.overlaps(start, end))
                })
                .cloned()
                .collect())
        })
    }

    fn create<'a>(&'a self, uid: &'a str, ics: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let href = format!("{COLLECTION}{uid}.ics");
            let mut objects = self.objects.lock().await;
            if objects.iter().any(|o| o.href == href) {
                return Err(ProviderError::from_status(412, format!("{href} already exists"))
                    .with_provider("memory"));
            }
            let etag = format!("\"{}\"", objects.len() + 1);
            objects.push(CalendarObject::new(href.clone(), ics).with_etag(etag));
            debug!(href = %href, "Stored object");
            Ok(href)
        })
    }

    fn delete<'a>(&'a self, object: &'a CalendarObject) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut objects = self.objects.lock().await;
            let Some(index) = objects.iter().position(|o| o.href == object.href) else {
                return Err(ProviderError::not_found(format!("{} does not exist", object.href))
                    .with_provider("memory"));
            };
            objects.remove(index);
            debug!(href = %object.href, "Removed object");
            Ok(())
        })
    }
}
