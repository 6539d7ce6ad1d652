// --------------------------------------------------
// Request validation applied before anything reaches the store.
//
// Checks run in a fixed order and the first failure is returned:
//   missing fields -> date parse -> range -> title length
//   -> color -> reminder -> variant fields
// -------------------------------------------------

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{ApiError, RANGE_MESSAGE};
use crate::logic::DateRange;
use crate::models::{
    Availability, EventKind, EventPatch, EventPayload, EventType, NewEvent, RangeQuery,
    SlotPayload, TaskStatus, TimeSlot, DEFAULT_COLOR,
};

pub const TITLE_MAX_CHARS: usize = 100;

/// Parse an ISO-8601 timestamp.
///
/// Values without an offset are read as UTC; a bare date is UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// "" and absent are the same thing for required fields
fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn timestamp(raw: &str, label: &str) -> Result<DateTime<Utc>, ApiError> {
    parse_timestamp(raw).ok_or_else(|| ApiError::InvalidDate(format!("Invalid {label} format")))
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if start >= end {
        return Err(ApiError::InvalidRange(RANGE_MESSAGE.to_string()));
    }
    Ok(())
}

fn check_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    let len = title.chars().count();
    if len == 0 || len > TITLE_MAX_CHARS {
        return Err(ApiError::InvalidLength);
    }
    Ok(title.to_string())
}

/// `#` followed by exactly six hex digits, either case.
pub fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn check_color(raw: &str) -> Result<String, ApiError> {
    if !is_hex_color(raw) {
        return Err(ApiError::InvalidColor);
    }
    Ok(raw.to_string())
}

fn check_reminder(raw: &Option<Value>) -> Result<Option<u32>, ApiError> {
    let bad = || ApiError::InvalidType("Reminder must be a number (minutes before event)".to_string());
    match raw {
        None | Some(Value::Null) => Ok(None),
        // 15 and 15.0 are the same number of minutes
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u64)
            })
            .and_then(|m| u32::try_from(m).ok())
            .map(Some)
            .ok_or_else(bad),
        Some(_) => Err(bad()),
    }
}

fn parse_enum<T: std::str::FromStr>(
    raw: Option<&str>,
    field: &str,
    allowed: &str,
) -> Result<Option<T>, ApiError> {
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|_| ApiError::InvalidType(format!("{field} must be one of {allowed}")))
    })
    .transpose()
}

fn check_slots(raw: &[SlotPayload]) -> Result<Vec<TimeSlot>, ApiError> {
    let mut slots = Vec::with_capacity(raw.len());
    for (i, slot) in raw.iter().enumerate() {
        let (start, end) = (present(&slot.start_time), present(&slot.end_time));
        let mut missing = Vec::new();
        if start.is_none() {
            missing.push(format!("alternateSlots[{i}].startTime"));
        }
        if end.is_none() {
            missing.push(format!("alternateSlots[{i}].endTime"));
        }
        let (Some(start), Some(end)) = (start, end) else {
            return Err(ApiError::MissingField(missing));
        };

        let start_time = timestamp(start, "alternate slot start time")?;
        let end_time = timestamp(end, "alternate slot end time")?;
        check_range(start_time, end_time)?;
        slots.push(TimeSlot {
            start_time,
            end_time,
        });
    }
    Ok(slots)
}

// Fields after the core checks; shared by create and update
struct Extras {
    color: Option<String>,
    reminder: Option<u32>,
    kind: Option<EventType>,
    deadline: Option<DateTime<Utc>>,
    status: Option<TaskStatus>,
    availability: Option<Availability>,
    alternate_slots: Option<Vec<TimeSlot>>,
}

fn check_extras(p: &EventPayload) -> Result<Extras, ApiError> {
    let color = p.color.as_deref().map(check_color).transpose()?;
    let reminder = check_reminder(&p.reminder)?;
    let kind = parse_enum(p.kind.as_deref(), "type", "event, task, appointment")?;
    let status = parse_enum(p.status.as_deref(), "status", "pending, in_progress, completed")?;
    let availability = parse_enum(
        p.availability.as_deref(),
        "availability",
        "available, unavailable, tentative",
    )?;
    let deadline = present(&p.deadline)
        .map(|raw| timestamp(raw, "deadline"))
        .transpose()?;
    let alternate_slots = p.alternate_slots.as_deref().map(check_slots).transpose()?;

    Ok(Extras {
        color,
        reminder,
        kind,
        deadline,
        status,
        availability,
        alternate_slots,
    })
}

/// Validate a create body and apply schema defaults.
pub fn validate_event_payload(p: &EventPayload) -> Result<NewEvent, ApiError> {
    let title = present(&p.title);
    let start = present(&p.start_time);
    let end = present(&p.end_time);

    let missing: Vec<String> = [("title", title), ("startTime", start), ("endTime", end)]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    let (Some(title), Some(start), Some(end)) = (title, start, end) else {
        return Err(ApiError::MissingField(missing));
    };

    let start_time = timestamp(start, "start time")?;
    let end_time = timestamp(end, "end time")?;
    check_range(start_time, end_time)?;
    let title = check_title(title)?;
    let extras = check_extras(p)?;

    let kind = match extras.kind.unwrap_or_default() {
        EventType::Event => EventKind::Event,
        EventType::Task => EventKind::Task {
            deadline: extras.deadline,
            status: extras.status.unwrap_or_default(),
        },
        EventType::Appointment => EventKind::Appointment {
            availability: extras.availability.unwrap_or_default(),
            alternate_slots: extras.alternate_slots.unwrap_or_default(),
        },
    };

    Ok(NewEvent {
        title,
        description: p.description.clone().unwrap_or_default(),
        start_time,
        end_time,
        color: extras.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        location: p.location.clone().unwrap_or_default(),
        is_all_day: p.is_all_day.unwrap_or(false),
        reminder: extras.reminder.unwrap_or(0),
        kind,
    })
}

/// Validate an update body. Only fields that are set are checked.
pub fn validate_event_patch(p: &EventPayload) -> Result<EventPatch, ApiError> {
    let missing: Vec<String> = [
        ("title", &p.title),
        ("startTime", &p.start_time),
        ("endTime", &p.end_time),
    ]
    .into_iter()
    .filter(|(_, v)| v.as_deref() == Some(""))
    .map(|(name, _)| name.to_string())
    .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingField(missing));
    }

    let start_time = p
        .start_time
        .as_deref()
        .map(|raw| timestamp(raw, "start time"))
        .transpose()?;
    let end_time = p
        .end_time
        .as_deref()
        .map(|raw| timestamp(raw, "end time"))
        .transpose()?;
    if let (Some(start), Some(end)) = (start_time, end_time) {
        check_range(start, end)?;
    }
    let title = p.title.as_deref().map(check_title).transpose()?;
    let extras = check_extras(p)?;

    Ok(EventPatch {
        title,
        kind: extras.kind,
        description: p.description.clone(),
        start_time,
        end_time,
        color: extras.color,
        location: p.location.clone(),
        is_all_day: p.is_all_day,
        reminder: extras.reminder,
        deadline: extras.deadline,
        status: extras.status,
        availability: extras.availability,
        alternate_slots: extras.alternate_slots,
    })
}

/// Validate list query bounds. `Ok(None)` means an unbounded query.
pub fn validate_date_range_query(q: &RangeQuery) -> Result<Option<DateRange>, ApiError> {
    match (present(&q.start_date), present(&q.end_date)) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(ApiError::IncompleteRange),
        (Some(start), Some(end)) => {
            let bad = || ApiError::InvalidDate("Invalid date format in range parameters".to_string());
            let start = parse_timestamp(start).ok_or_else(bad)?;
            let end = parse_timestamp(end).ok_or_else(bad)?;
            if start >= end {
                return Err(ApiError::InvalidRange(
                    "End date must be after start date".to_string(),
                ));
            }
            Ok(Some(DateRange { start, end }))
        }
    }
}
