/*
Range query and merge logic.
Module was independently written from HTTP / Axum for testing
*/

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Event, EventKind, EventPatch, EventType, NewEvent};

// Query window with inclusive bounds on both edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Whether an interval `[start, end]` touches this window.
    ///
    /// Matches when:
    /// - the interval starts inside the window, OR
    /// - the interval ends inside the window, OR
    /// - the interval spans the whole window
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        (self.start <= start && start <= self.end)
            || (self.start <= end && end <= self.end)
            || (start <= self.start && end >= self.end)
    }
}

// Ordering of the (startTime, endTime) index.
// id breaks ties so the order is total.
pub(crate) fn index_key(e: &Event) -> (DateTime<Utc>, DateTime<Utc>, Uuid) {
    (e.start_time, e.end_time, e.id)
}

/// Put `event` into a collection kept in index order.
pub fn insert_indexed(events: &mut Vec<Event>, event: Event) {
    let key = index_key(&event);
    let pos = events.partition_point(|e| index_key(e) < key);
    events.insert(pos, event);
}

/// Run a list query over a collection kept in index order.
///
/// Every matching clause needs `startTime <= window end`, so the scan stops
/// at the first document past it.
pub fn select(events: &[Event], range: Option<&DateRange>) -> Vec<Event> {
    match range {
        None => events.to_vec(),
        Some(r) => events
            .iter()
            .take_while(|e| e.start_time <= r.end)
            .filter(|e| r.overlaps(e.start_time, e.end_time))
            .cloned()
            .collect(),
    }
}

impl Event {
    pub fn from_new(draft: NewEvent, id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            color: draft.color,
            location: draft.location,
            is_all_day: draft.is_all_day,
            reminder: draft.reminder,
            kind: draft.kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge `patch` over this record.
    ///
    /// Returns `false` and leaves the record untouched when the merged
    /// interval would not satisfy `startTime < endTime`.
    pub fn apply(&mut self, patch: EventPatch, now: DateTime<Utc>) -> bool {
        let start = patch.start_time.unwrap_or(self.start_time);
        let end = patch.end_time.unwrap_or(self.end_time);
        if start >= end {
            return false;
        }

        self.start_time = start;
        self.end_time = end;
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.color {
            self.color = v;
        }
        if let Some(v) = patch.location {
            self.location = v;
        }
        if let Some(v) = patch.is_all_day {
            self.is_all_day = v;
        }
        if let Some(v) = patch.reminder {
            self.reminder = v;
        }

        let target = patch.kind.unwrap_or(self.kind.event_type());
        let current = std::mem::replace(&mut self.kind, EventKind::Event);
        self.kind = match (target, current) {
            (EventType::Event, _) => EventKind::Event,
            (EventType::Task, EventKind::Task { deadline, status }) => EventKind::Task {
                deadline: patch.deadline.or(deadline),
                status: patch.status.unwrap_or(status),
            },
            (EventType::Task, _) => EventKind::Task {
                deadline: patch.deadline,
                status: patch.status.unwrap_or_default(),
            },
            (
                EventType::Appointment,
                EventKind::Appointment {
                    availability,
                    alternate_slots,
                },
            ) => EventKind::Appointment {
                availability: patch.availability.unwrap_or(availability),
                alternate_slots: patch.alternate_slots.unwrap_or(alternate_slots),
            },
            (EventType::Appointment, _) => EventKind::Appointment {
                availability: patch.availability.unwrap_or_default(),
                alternate_slots: patch.alternate_slots.unwrap_or_default(),
            },
        };

        self.updated_at = now;
        true
    }
}
