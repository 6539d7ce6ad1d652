use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_COLOR: &str = "#4285f4";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventType {
    #[default]
    Event,
    Task,
    Appointment,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
    Tentative,
}

/// Returned when a wire string is not one of an enum's known values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant;

impl FromStr for EventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "task" => Ok(Self::Task),
            "appointment" => Ok(Self::Appointment),
            _ => Err(UnknownVariant),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownVariant),
        }
    }
}

impl FromStr for Availability {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "tentative" => Ok(Self::Tentative),
            _ => Err(UnknownVariant),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Event => "event",
            Self::Task => "task",
            Self::Appointment => "appointment",
        })
    }
}

// One alternative time proposed by an appointment that is not available
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Variant-specific part of an [`Event`], tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum EventKind {
    Event,
    Task {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<DateTime<Utc>>,
        #[serde(default)]
        status: TaskStatus,
    },
    Appointment {
        #[serde(default)]
        availability: Availability,
        #[serde(default)]
        alternate_slots: Vec<TimeSlot>,
    },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Event => EventType::Event,
            Self::Task { .. } => EventType::Task,
            Self::Appointment { .. } => EventType::Appointment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: String,
    pub location: String,
    pub is_all_day: bool,
    pub reminder: u32, // minutes before start
    #[serde(flatten)]
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db {
    pub events: Vec<Event>,
}

// -----------------------------
// Inbound shapes
// -----------------------------

/// Raw create/update body. Every field is optional so that validation, not
/// deserialization, decides what is missing or malformed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub color: Option<String>,
    pub location: Option<String>,
    pub is_all_day: Option<bool>,
    pub reminder: Option<serde_json::Value>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    pub availability: Option<String>,
    pub alternate_slots: Option<Vec<SlotPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPayload {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// -----------------------------
// Validated shapes
// -----------------------------

/// Create draft with schema defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: String,
    pub location: String,
    pub is_all_day: bool,
    pub reminder: u32,
    pub kind: EventKind,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub kind: Option<EventType>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub location: Option<String>,
    pub is_all_day: Option<bool>,
    pub reminder: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub availability: Option<Availability>,
    pub alternate_slots: Option<Vec<TimeSlot>>,
}
