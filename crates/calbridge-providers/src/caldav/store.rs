//! [`CalendarStore`] backed by a CalDAV server.

use calbridge_core::TimeWindow;
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::store::{BoxFuture, CalendarObject, CalendarStore};

use super::client::CalDavClient;
use super::config::CalDavConfig;
use super::xml::{
    DiscoveredCalendar, calendar_home_set_body, calendar_query_body, current_user_principal_body,
    parse_calendar_collections, parse_href_property, parse_report_response,
    propfind_calendars_body,
};

const PROVIDER: &str = "caldav";

/// CalDAV-backed store.
///
/// Every operation walks principal, calendar home and collection listing
/// before touching the first calendar that accepts events.
pub struct CalDavStore {
    client: CalDavClient,
    config: CalDavConfig,
}

impl CalDavStore {
    pub fn new(config: CalDavConfig) -> ProviderResult<Self> {
        let client = CalDavClient::new(&config).map_err(|e| e.with_provider(PROVIDER))?;
        Ok(Self { client, config })
    }

    /// Resolves the URL of the calendar every operation targets.
    async fn calendar_url(&self) -> ProviderResult<Url> {
        let base = &self.config.url;

        let body = current_user_principal_body()?;
        let response = self.client.propfind(base, &body, 0).await?;
        let principal = match parse_href_property(&response, "current-user-principal") {
            Some(href) => resolve_href(base, &href)?,
            None => {
                debug!(url = %base, "No current-user-principal, using base URL");
                base.clone()
            }
        };

        let body = calendar_home_set_body()?;
        let response = self.client.propfind(&principal, &body, 0).await?;
        let home = match parse_href_property(&response, "calendar-home-set") {
            Some(href) => resolve_href(&principal, &href)?,
            None => {
                debug!(url = %principal, "No calendar-home-set, using principal URL");
                principal
            }
        };

        let body = propfind_calendars_body()?;
        let response = self.client.propfind(&home, &body, 1).await?;
        let calendars = parse_calendar_collections(&response);
        debug!(home = %home, count = calendars.len(), "Listed calendar collections");

        let calendar = pick_calendar(&calendars)
            .ok_or_else(|| ProviderError::calendar("No calendars found."))?;
        let url = resolve_href(&home, &calendar.href)?;

        debug!(
            calendar = %url,
            name = calendar.display_name.as_deref().unwrap_or(""),
            "Using calendar"
        );
        Ok(url)
    }

    async fn search_inner(
        &self,
        window: TimeWindow,
        expand: bool,
    ) -> ProviderResult<Vec<CalendarObject>> {
        let calendar = self.calendar_url().await?;
        let body = calendar_query_body(&window, expand)?;
        let response = self.client.report(&calendar, &body).await?;
        let objects = parse_report_response(&response);

        info!(
            start = %window.start,
            end = %window.end,
            expand,
            count = objects.len(),
            "Searched calendar"
        );
        Ok(objects)
    }

    async fn create_inner(&self, uid: &str, ics: &str) -> ProviderResult<String> {
        let calendar = self.calendar_url().await?;
        let url = object_url(&calendar, uid)?;
        self.client.put_new(&url, ics).await?;

        info!(uid = %uid, url = %url, "Created calendar object");
        Ok(url.path().to_string())
    }

    async fn delete_inner(&self, object: &CalendarObject) -> ProviderResult<()> {
        let calendar = self.calendar_url().await?;
        let url = resolve_href(&calendar, &object.href)?;
        self.client.delete(&url, object.etag.as_deref()).await?;

        info!(url = %url, "Deleted calendar object");
        Ok(())
    }
}

impl CalendarStore for CalDavStore {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn search(
        &self,
        window: TimeWindow,
        expand: bool,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarObject>>> {
        Box::pin(async move {
            self.search_inner(window, expand)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn create<'a>(&'a self, uid: &'a str, ics: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.create_inner(uid, ics)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }

    fn delete<'a>(&'a self, object: &'a CalendarObject) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.delete_inner(object)
                .await
                .map_err(|e| e.with_provider(PROVIDER))
        })
    }
}

/// First collection that accepts events.
fn pick_calendar(calendars: &[DiscoveredCalendar]) -> Option<&DiscoveredCalendar> {
    calendars.iter().find(|c| c.accepts_events())
}

/// Resolves an href (absolute URL, absolute path or relative path) against `base`.
fn resolve_href(base: &Url, href: &str) -> ProviderResult<Url> {
    base.join(href)
        .map_err(|e| ProviderError::invalid_response(format!("Invalid href {href:?}: {e}")))
}

/// `<calendar>/<uid>.ics`, with the uid encoded as a single path segment.
fn object_url(calendar: &Url, uid: &str) -> ProviderResult<Url> {
    let mut url = calendar.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::configuration(format!("Not a hierarchical URL: {calendar}")))?
        .pop_if_empty()
        .push(&format!("{uid}.ics"));
    Ok(url)
}
