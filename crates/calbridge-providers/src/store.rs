//! The [`CalendarStore`] trait: the remote calendar as the services see it.
//!
//! A store resolves its calendar collection on every call; nothing is cached
//! between requests.

use std::future::Future;
use std::pin::Pin;

use calbridge_core::TimeWindow;

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods, keeping the trait object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stored calendar resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    /// Location of the resource, as returned by the server.
    pub href: String,
    /// Entity tag, when the server reports one.
    pub etag: Option<String>,
    /// iCalendar text of the resource.
    pub data: String,
}

impl CalendarObject {
    pub fn new(href: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            etag: None,
            data: data.into(),
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Access to the first calendar collection of the configured account.
pub trait CalendarStore: Send + Sync {
    /// Short name used in logs and errors ("caldav", "memory").
    fn name(&self) -> &str;

    /// Returns the objects with an event overlapping `window`, in server order.
    ///
    /// With `expand` set, recurring events come back as their individual
    /// occurrences inside the window.
    fn search(
        &self,
        window: TimeWindow,
        expand: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarObject>>>;

    /// Stores a new object for `uid`, returning its href.
    ///
    /// Fails if an object already exists at that location.
    fn create<'a>(&'a self, uid: &'a str, ics: &'a str) -> BoxFuture<'a, ProviderResult<String>>;

    /// Removes a previously returned object.
    fn delete<'a>(&'a self, object: &'a CalendarObject) -> BoxFuture<'a, ProviderResult<()>>;
}

/// A store that fails every call with the same error.
///
/// Stands in for a store whose construction failed, and drives the
/// upstream-failure paths in tests.
#[derive(Debug)]
pub struct ErrorStore {
    name: String,
    error: ProviderError,
}

impl ErrorStore {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn fail<T: Send + 'static>(&self) -> BoxFuture<'_, ProviderResult<T>> {
        let error = self.error.duplicate().with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}

impl CalendarStore for ErrorStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(
        &self,
        _window: TimeWindow,
        _expand: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarObject>>> {
        self.fail()
    }

    fn create<'a>(&'a self, _uid: &'a str, _ics: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        self.fail()
    }

    fn delete<'a>(&'a self, _object: &'a CalendarObject) -> BoxFuture<'a, ProviderResult<()>> {
        self.fail()
    }
}
