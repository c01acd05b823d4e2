use kernel::model::{
    event::EventStatus,
    id::{EventId, UserId, WaitlistEntryId},
    registration::WaitlistEntry,
};
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct WaitlistRow {
    pub waitlist_id: WaitlistEntryId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

impl From<WaitlistRow> for WaitlistEntry {
    fn from(value: WaitlistRow) -> Self {
        let WaitlistRow {
            waitlist_id,
            event_id,
            user_id,
            joined_at,
        } = value;
        WaitlistEntry {
            waitlist_id,
            event_id,
            user_id,
            joined_at,
        }
    }
}

/// get_event_status 用。登録・待ち行列の有無をサブクエリで埋める
#[derive(sqlx::FromRow)]
pub struct EventStatusRow {
    pub filled_spots: i32,
    pub capacity: i32,
    pub is_registered: bool,
    pub is_waitlisted: bool,
}

impl From<EventStatusRow> for EventStatus {
    fn from(value: EventStatusRow) -> Self {
        EventStatus {
            filled: value.filled_spots,
            capacity: value.capacity,
            is_registered: value.is_registered,
            is_waitlisted: value.is_waitlisted,
        }
    }
}
