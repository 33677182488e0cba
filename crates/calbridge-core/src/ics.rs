//! iCalendar (RFC 5545) encoding and decoding of bridge events.
//!
//! Encoding produces one `VCALENDAR` holding a single `VEVENT` whose times
//! carry the configured zone as `TZID`. Decoding is lenient: every field is
//! read independently and a missing one never fails the whole object.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
    Property,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::{DecodedEvent, NewEvent};
use crate::time::LocalZone;

/// Product identifier written into every generated calendar.
pub const PRODUCT_ID: &str = "-//CalendarBridge//EN";

/// Domain part of generated UIDs.
pub const UID_DOMAIN: &str = "calendar-bridge";

const ICAL_LOCAL: &str = "%Y%m%dT%H%M%S";
const ICAL_UTC: &str = "%Y%m%dT%H%M%SZ";
const NAIVE_DISPLAY: &str = "%Y-%m-%dT%H:%M:%S";

/// A freshly encoded event ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEvent {
    pub uid: String,
    pub ics: String,
}

/// Generates a new globally unique event identifier.
pub fn new_uid() -> String {
    format!("{}@{}", Uuid::new_v4(), UID_DOMAIN)
}

/// Encodes an event under a freshly generated UID.
pub fn encode_event(event: &NewEvent) -> EncodedEvent {
    encode_event_with_uid(event, new_uid())
}

/// Encodes an event under the given UID.
pub fn encode_event_with_uid(event: &NewEvent, uid: String) -> EncodedEvent {
    let mut vevent = Event::new();
    vevent.uid(&uid);
    vevent.add_property("DTSTAMP", Utc::now().format(ICAL_UTC).to_string());
    vevent.summary(&event.title);
    vevent.append_property(zoned_property("DTSTART", &event.start));
    vevent.append_property(zoned_property("DTEND", &event.end));

    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        vevent.location(location);
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        vevent.description(description);
    }

    let mut calendar = Calendar::new();
    calendar.push(vevent.done());
    let ics = with_product_id(&calendar.done().to_string());

    debug!(uid = %uid, tzid = event.tzid(), "Encoded event");
    EncodedEvent { uid, ics }
}

fn zoned_property(name: &str, at: &DateTime<Tz>) -> Property {
    let mut prop = Property::new(name, at.naive_local().format(ICAL_LOCAL).to_string());
    prop.add_parameter("TZID", at.timezone().name());
    prop
}

/// Swaps the library's product identifier for ours.
fn with_product_id(ics: &str) -> String {
    let mut out = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            out.push_str("PRODID:");
            out.push_str(PRODUCT_ID);
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }
    out
}

fn parse_calendar(ics: &str) -> Option<Calendar> {
    match ics.parse::<Calendar>() {
        Ok(calendar) => Some(calendar),
        Err(e) => {
            warn!(error = %e, "Failed to parse ICS content");
            None
        }
    }
}

fn events(calendar: &Calendar) -> impl Iterator<Item = &Event> {
    calendar.iter().filter_map(|component| match component {
        CalendarComponent::Event(event) => Some(event),
        _ => None,
    })
}

/// Decodes every `VEVENT` of a stored object.
///
/// Servers return expanded recurrences as several components of the same
/// object, so one object may yield several events. Text that does not parse
/// yields nothing.
pub fn decode_object(ics: &str) -> Vec<DecodedEvent> {
    let Some(calendar) = parse_calendar(ics) else {
        return Vec::new();
    };
    let mut summaries = raw_summaries(ics).into_iter();
    events(&calendar)
        .map(|event| decode_event(event, summaries.next().flatten()))
        .collect()
}

fn decode_event(event: &Event, summary: Option<String>) -> DecodedEvent {
    DecodedEvent {
        uid: event.get_uid().map(str::to_string),
        summary: summary.or_else(|| event.get_summary().map(str::to_string)),
        start: event.get_start().map(render_time),
        end: event.get_end().map(render_time),
    }
}

/// `SUMMARY` of each `VEVENT`, in document order, unescaped from the source.
///
/// The parser's own text unescaping reads an escaped backslash followed by
/// `n` as a line break.
fn raw_summaries(ics: &str) -> Vec<Option<String>> {
    let unfolded = icalendar::parser::unfold(ics);
    let mut open: Vec<String> = Vec::new();
    let mut summaries = Vec::new();
    for line in unfolded.lines() {
        let line = line.trim();
        let (name, value) = split_content_line(line);
        if name.eq_ignore_ascii_case("BEGIN") {
            let component = value.unwrap_or_default().to_ascii_uppercase();
            if component == "VEVENT" {
                summaries.push(None);
            }
            open.push(component);
        } else if name.eq_ignore_ascii_case("END") {
            open.pop();
        } else if name.eq_ignore_ascii_case("SUMMARY")
            && open.last().is_some_and(|c| c == "VEVENT")
            && let Some(slot) = summaries.last_mut()
            && slot.is_none()
        {
            *slot = value.map(unescape_text);
        }
    }
    summaries
}

/// Splits a content line into its name and its value, skipping parameters.
fn split_content_line(line: &str) -> (&str, Option<&str>) {
    let name_end = line.find([';', ':']).unwrap_or(line.len());
    let mut quoted = false;
    for (i, c) in line[name_end..].char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return (&line[..name_end], Some(&line[name_end + i + 1..])),
            _ => {}
        }
    }
    (&line[..name_end], None)
}

/// Reverses RFC 5545 TEXT escaping in a single pass.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

/// UID of the first `VEVENT` of a stored object.
pub fn first_uid(ics: &str) -> Option<String> {
    let calendar = parse_calendar(ics)?;
    events(&calendar)
        .next()
        .and_then(|event| event.get_uid().map(str::to_string))
}

/// Absolute start and end of the first `VEVENT` of a stored object.
///
/// A missing end collapses onto the start.
pub fn event_span(ics: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let calendar = parse_calendar(ics)?;
    let event = events(&calendar).next()?;
    let start = absolute(event.get_start()?);
    let end = event.get_end().map(absolute).unwrap_or(start);
    Some((start, end))
}

fn render_time(value: DatePerhapsTime) -> String {
    match value {
        DatePerhapsTime::Date(date) => date.format("%Y-%m-%d").to_string(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt.to_rfc3339(),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            naive.format(NAIVE_DISPLAY).to_string()
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match LocalZone::from_name(&tzid) {
                Ok(zone) => zone.attach(date_time).to_rfc3339(),
                Err(_) => date_time.format(NAIVE_DISPLAY).to_string(),
            }
        }
    }
}

fn absolute(value: DatePerhapsTime) -> DateTime<Utc> {
    let zoned = |naive: NaiveDateTime, tzid: &str| match LocalZone::from_name(tzid) {
        Ok(zone) => zone.attach(naive).with_timezone(&Utc),
        Err(_) => Utc.from_utc_datetime(&naive),
    };
    match value {
        DatePerhapsTime::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => naive.and_utc(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            zoned(date_time, &tzid)
        }
    }
}
