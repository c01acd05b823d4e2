use chrono::{DateTime, Utc};
use derive_new::new;

use crate::model::id::{EventId, UserId};

#[derive(new)]
pub struct CreateEvent {
    pub event_name: String,
    pub event_desc: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub location: String,
    pub is_sponsored: bool,
}

#[derive(Debug)]
pub struct UpdateEvent {
    pub event_id: EventId,
    pub event_name: Option<String>,
    pub event_desc: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub is_sponsored: Option<bool>,
    pub requested_user: UserId,
}

#[derive(Debug)]
pub struct DeleteEvent {
    pub event_id: EventId,
    pub requested_user: UserId,
}
