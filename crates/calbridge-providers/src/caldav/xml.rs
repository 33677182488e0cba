//! WebDAV/CalDAV XML bodies and multistatus parsing.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use calbridge_core::TimeWindow;
use chrono::{DateTime, Utc};

use crate::error::{ProviderError, ProviderResult};
use crate::store::CalendarObject;

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// A calendar collection found under the calendar home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCalendar {
    pub href: String,
    pub display_name: Option<String>,
    /// Component types the collection accepts; empty when not reported.
    pub components: Vec<String>,
}

impl DiscoveredCalendar {
    /// Whether events can live here. Collections that do not report their
    /// component set are assumed to accept events.
    pub fn accepts_events(&self) -> bool {
        self.components.is_empty() || self.components.iter().any(|c| c == "VEVENT")
    }
}

/// Thin wrapper over the quick-xml writer that turns write failures into
/// provider errors.
struct BodyWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl BodyWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn write(&mut self, event: Event<'_>) -> ProviderResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| ProviderError::internal(format!("Failed to write XML body: {e}")))
    }

    /// Opens the root element, declaring both namespaces.
    fn root(&mut self, name: &str) -> ProviderResult<()> {
        let mut root = BytesStart::new(name);
        root.push_attribute(("xmlns:d", DAV_NS));
        root.push_attribute(("xmlns:c", CALDAV_NS));
        self.write(Event::Start(root))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> ProviderResult<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.write(Event::Start(start))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> ProviderResult<()> {
        let mut empty = BytesStart::new(name);
        for attr in attrs {
            empty.push_attribute(*attr);
        }
        self.write(Event::Empty(empty))
    }

    fn end(&mut self, name: &str) -> ProviderResult<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> ProviderResult<String> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| ProviderError::internal(format!("XML body is not UTF-8: {e}")))
    }
}

/// PROPFIND body asking for a list of DAV properties.
fn propfind_body(props: &[&str]) -> ProviderResult<String> {
    let mut w = BodyWriter::new();
    w.root("d:propfind")?;
    w.start("d:prop", &[])?;
    for prop in props {
        w.empty(prop, &[])?;
    }
    w.end("d:prop")?;
    w.end("d:propfind")?;
    w.finish()
}

/// PROPFIND body for the authenticated user's principal.
pub fn current_user_principal_body() -> ProviderResult<String> {
    propfind_body(&["d:current-user-principal"])
}

/// PROPFIND body for the principal's calendar home.
pub fn calendar_home_set_body() -> ProviderResult<String> {
    propfind_body(&["c:calendar-home-set"])
}

/// PROPFIND body listing the collections under the calendar home.
pub fn propfind_calendars_body() -> ProviderResult<String> {
    propfind_body(&[
        "d:resourcetype",
        "d:displayname",
        "c:supported-calendar-component-set",
    ])
}

/// REPORT calendar-query body matching events that overlap `window`.
///
/// With `expand`, the server is asked to return recurring events as their
/// individual occurrences within the same window.
pub fn calendar_query_body(window: &TimeWindow, expand: bool) -> ProviderResult<String> {
    let start = format_icalendar_datetime(window.start);
    let end = format_icalendar_datetime(window.end);
    let range = [("start", start.as_str()), ("end", end.as_str())];

    let mut w = BodyWriter::new();
    w.root("c:calendar-query")?;

    w.start("d:prop", &[])?;
    w.empty("d:getetag", &[])?;
    if expand {
        w.start("c:calendar-data", &[])?;
        w.empty("c:expand", &range)?;
        w.end("c:calendar-data")?;
    } else {
        w.empty("c:calendar-data", &[])?;
    }
    w.end("d:prop")?;

    w.start("c:filter", &[])?;
    w.start("c:comp-filter", &[("name", "VCALENDAR")])?;
    w.start("c:comp-filter", &[("name", "VEVENT")])?;
    w.empty("c:time-range", &range)?;
    w.end("c:comp-filter")?;
    w.end("c:comp-filter")?;
    w.end("c:filter")?;

    w.end("c:calendar-query")?;
    w.finish()
}

fn reader(xml: &str) -> quick_xml::Reader<&[u8]> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Returns the first `href` found inside the named property, e.g. the
/// target of `current-user-principal` or `calendar-home-set`.
pub fn parse_href_property(xml: &str, property: &str) -> Option<String> {
    let mut reader = reader(xml);
    let mut inside = false;
    let mut in_href = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = qname(&e);
                match local_name(&name) {
                    n if n == property => inside = true,
                    "href" if inside => in_href = true,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match local_name(&name) {
                    n if n == property => inside = false,
                    "href" => in_href = false,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) if in_href => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Per-response accumulator for [`parse_calendar_collections`].
#[derive(Default)]
struct CollectionState {
    href: Option<String>,
    display_name: Option<String>,
    components: Vec<String>,
    is_calendar: bool,
    in_resourcetype: bool,
    current: Option<&'static str>,
}

impl CollectionState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = qname(e);
        match local_name(&name) {
            "response" => *self = Self::default(),
            "href" if !empty => self.current = Some("href"),
            "displayname" if !empty => self.current = Some("displayname"),
            "resourcetype" if !empty => self.in_resourcetype = true,
            "calendar" if self.in_resourcetype => self.is_calendar = true,
            "comp" => {
                if let Ok(Some(attr)) = e.try_get_attribute("name")
                    && let Ok(value) = attr.unescape_value()
                {
                    self.components.push(value.to_ascii_uppercase());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: String) {
        match self.current {
            // Only the response's own href; nested hrefs come later.
            Some("href") if self.href.is_none() => self.href = Some(text),
            Some("displayname") => self.display_name = Some(text),
            _ => {}
        }
    }

    fn take_calendar(&mut self) -> Option<DiscoveredCalendar> {
        if !self.is_calendar {
            return None;
        }
        let href = self.href.take()?;
        Some(DiscoveredCalendar {
            href,
            display_name: self.display_name.take(),
            components: std::mem::take(&mut self.components),
        })
    }
}

/// Parses a Depth 1 PROPFIND response into the calendar collections it lists,
/// in document order.
pub fn parse_calendar_collections(xml: &str) -> Vec<DiscoveredCalendar> {
    let mut calendars = Vec::new();
    let mut reader = reader(xml);
    let mut state = CollectionState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.open(&e, false),
            Ok(Event::Empty(e)) => state.open(&e, true),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match local_name(&name) {
                    "response" => calendars.extend(state.take_calendar()),
                    "resourcetype" => state.in_resourcetype = false,
                    _ => {}
                }
                state.current = None;
            }
            Ok(Event::Text(e)) => state.text(e.unescape().unwrap_or_default().into_owned()),
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    calendars
}

/// Parses a calendar-query REPORT response into stored objects, keeping the
/// server's order. Responses without calendar data are skipped.
pub fn parse_report_response(xml: &str) -> Vec<CalendarObject> {
    let mut objects = Vec::new();
    let mut reader = reader(xml);

    let mut href: Option<String> = None;
    let mut etag: Option<String> = None;
    let mut data: Option<String> = None;
    let mut current: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = qname(&e);
                match local_name(&name) {
                    "response" => {
                        href = None;
                        etag = None;
                        data = None;
                    }
                    "href" => current = Some("href"),
                    "getetag" => current = Some("getetag"),
                    "calendar-data" => current = Some("calendar-data"),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if local_name(&name) == "response"
                    && let (Some(href), Some(data)) = (href.take(), data.take())
                {
                    objects.push(CalendarObject {
                        href,
                        etag: etag.take(),
                        data,
                    });
                }
                current = None;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default();
                append(current, &text, &mut href, &mut etag, &mut data);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e);
                append(current, &text, &mut href, &mut etag, &mut data);
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    objects
}

fn append(
    current: Option<&str>,
    text: &str,
    href: &mut Option<String>,
    etag: &mut Option<String>,
    data: &mut Option<String>,
) {
    let slot = match current {
        Some("href") => href,
        Some("getetag") => etag,
        Some("calendar-data") => data,
        _ => return,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

/// Extracts the local name from a potentially prefixed element name.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Formats a datetime for CalDAV time-range attributes (UTC).
fn format_icalendar_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn principal_and_home_bodies() {
        let body = current_user_principal_body().unwrap();
        assert!(body.starts_with("<d:propfind"));
        assert!(body.contains("<d:current-user-principal/>"));

        let body = calendar_home_set_body().unwrap();
        assert!(body.contains(r#"xmlns:c="urn:ietf:params:xml:ns:caldav""#));
        assert!(body.contains("<c:calendar-home-set/>"));
    }

    #[test]
    fn calendars_body() {
        let body = propfind_calendars_body().unwrap();
        assert!(body.contains("<d:resourcetype/>"));
        assert!(body.contains("<d:displayname/>"));
        assert!(body.contains("<c:supported-calendar-component-set/>"));
    }

    #[test]
    fn calendar_query_with_expand() {
        let body = calendar_query_body(&window(), true).unwrap();
        assert!(body.contains(
            r#"<c:calendar-data><c:expand start="20250201T000000Z" end="20250228T235959Z"/></c:calendar-data>"#
        ));
        assert!(body.contains(r#"<c:comp-filter name="VCALENDAR"><c:comp-filter name="VEVENT">"#));
        assert!(body.contains(r#"<c:time-range start="20250201T000000Z" end="20250228T235959Z"/>"#));
    }

    #[test]
    fn calendar_query_without_expand() {
        let body = calendar_query_body(&window(), false).unwrap();
        assert!(body.contains("<c:calendar-data/>"));
        assert!(!body.contains("expand"));
        assert!(body.contains("time-range"));
    }

    #[test]
    fn parse_principal_href() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<multistatus xmlns="DAV:">
  <response>
    <href>/</href>
    <propstat>
      <prop>
        <current-user-principal>
          <href>/123456789/principal/</href>
        </current-user-principal>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;
        assert_eq!(
            parse_href_property(xml, "current-user-principal").as_deref(),
            Some("/123456789/principal/")
        );
        assert_eq!(parse_href_property(xml, "calendar-home-set"), None);
    }

    #[test]
    fn parse_home_set_absolute_href() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/123456789/principal/</d:href>
    <d:propstat>
      <d:prop>
        <cal:calendar-home-set>
          <d:href>https://p42-caldav.icloud.com:443/123456789/calendars/</d:href>
        </cal:calendar-home-set>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        assert_eq!(
            parse_href_property(xml, "calendar-home-set").as_deref(),
            Some("https://p42-caldav.icloud.com:443/123456789/calendars/")
        );
    }

    #[test]
    fn parse_collections_keeps_order_and_components() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/calendars/user/</href>
    <propstat>
      <prop>
        <resourcetype><collection/></resourcetype>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/calendars/user/tasks/</href>
    <propstat>
      <prop>
        <displayname>Reminders</displayname>
        <resourcetype><collection/><C:calendar/></resourcetype>
        <C:supported-calendar-component-set><C:comp name="VTODO"/></C:supported-calendar-component-set>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/calendars/user/home/</href>
    <propstat>
      <prop>
        <displayname>Home</displayname>
        <resourcetype><collection/><C:calendar/></resourcetype>
        <C:supported-calendar-component-set><C:comp name="VEVENT"/></C:supported-calendar-component-set>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/calendars/user/work/</href>
    <propstat>
      <prop>
        <displayname>Work</displayname>
        <resourcetype><collection/><C:calendar/></resourcetype>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;

        let calendars = parse_calendar_collections(xml);
        assert_eq!(calendars.len(), 3);
        assert_eq!(calendars[0].href, "/calendars/user/tasks/");
        assert_eq!(calendars[0].components, vec!["VTODO".to_string()]);
        assert!(!calendars[0].accepts_events());
        assert_eq!(calendars[1].display_name.as_deref(), Some("Home"));
        assert!(calendars[1].accepts_events());
        assert!(calendars[2].components.is_empty());
        assert!(calendars[2].accepts_events());
    }

    #[test]
    fn parse_report_objects() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/calendars/user/work/event1.ics</href>
    <propstat>
      <prop>
        <getetag>"abc123"</getetag>
        <C:calendar-data>BEGIN:VCALENDAR&#13;
VERSION:2.0&#13;
BEGIN:VEVENT&#13;
UID:event1@example.com&#13;
SUMMARY:Team Meeting&#13;
END:VEVENT&#13;
END:VCALENDAR</C:calendar-data>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/calendars/user/work/event2.ics</href>
    <propstat>
      <prop>
        <getetag>"def456"</getetag>
        <C:calendar-data><![CDATA[BEGIN:VCALENDAR
END:VCALENDAR]]></C:calendar-data>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/calendars/user/work/</href>
    <propstat>
      <prop><getetag>"coll"</getetag></prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;

        let objects = parse_report_response(xml);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].href, "/calendars/user/work/event1.ics");
        assert_eq!(objects[0].etag.as_deref(), Some("\"abc123\""));
        assert!(objects[0].data.contains("UID:event1@example.com\r\n"));
        assert_eq!(objects[1].href, "/calendars/user/work/event2.ics");
        assert!(objects[1].data.starts_with("BEGIN:VCALENDAR"));
    }

    #[test]
    fn malformed_xml_yields_nothing() {
        assert!(parse_report_response("<multistatus><response>").is_empty());
        assert!(parse_calendar_collections("not xml").is_empty());
    }

    #[test]
    fn format_datetime_for_icalendar() {
        let dt = Utc.with_ymd_and_hms(2025, 2, 5, 14, 30, 0).unwrap();
        assert_eq!(format_icalendar_datetime(dt), "20250205T143000Z");
    }
}
