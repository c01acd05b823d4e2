use kernel::model::{
    event::{Event, EventSpots, EventWithStatus},
    id::EventId,
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub event_id: EventId,
    pub event_name: String,
    pub event_desc: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub filled_spots: i32,
    pub location: String,
    pub is_sponsored: bool,
}

impl From<EventRow> for Event {
    fn from(value: EventRow) -> Self {
        let EventRow {
            event_id,
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            filled_spots,
            location,
            is_sponsored,
        } = value;
        Event {
            event_id,
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            filled_spots,
            location,
            is_sponsored,
        }
    }
}

/// 一覧取得時に使う型。利用者から見た状態フラグを LEFT JOIN で埋める
#[derive(sqlx::FromRow)]
pub struct EventWithStatusRow {
    pub event_id: EventId,
    pub event_name: String,
    pub event_desc: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub filled_spots: i32,
    pub location: String,
    pub is_sponsored: bool,
    pub is_registered: bool,
    pub is_waitlisted: bool,
    pub is_full: bool,
    pub in_past: bool,
}

impl From<EventWithStatusRow> for EventWithStatus {
    fn from(value: EventWithStatusRow) -> Self {
        let EventWithStatusRow {
            event_id,
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            filled_spots,
            location,
            is_sponsored,
            is_registered,
            is_waitlisted,
            is_full,
            in_past,
        } = value;
        EventWithStatus {
            event: Event {
                event_id,
                event_name,
                event_desc,
                start_time,
                end_time,
                capacity,
                filled_spots,
                location,
                is_sponsored,
            },
            is_registered,
            is_waitlisted,
            is_full,
            in_past,
        }
    }
}

/// 定員台帳の読み取りに使う型
#[derive(sqlx::FromRow)]
pub struct EventSpotsRow {
    pub filled_spots: i32,
    pub capacity: i32,
}

impl From<EventSpotsRow> for EventSpots {
    fn from(value: EventSpotsRow) -> Self {
        EventSpots {
            filled: value.filled_spots,
            capacity: value.capacity,
        }
    }
}
