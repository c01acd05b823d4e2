use chrono::{DateTime, Utc};

use crate::model::id::EventId;

pub mod event;

#[derive(Debug, Clone)]
pub struct Event {
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

/// 定員台帳の読み取り結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSpots {
    pub filled: i32,
    pub capacity: i32,
}

impl EventSpots {
    pub fn is_full(&self) -> bool {
        self.filled >= self.capacity
    }
}

/// 一覧表示用。イベント情報に、リクエストした利用者から見た状態フラグを添える
#[derive(Debug)]
pub struct EventWithStatus {
    pub event: Event,
    pub is_registered: bool,
    pub is_waitlisted: bool,
    pub is_full: bool,
    pub in_past: bool,
}

/// `get_event_status` が返す、1 イベント分の登録状況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStatus {
    pub filled: i32,
    pub capacity: i32,
    pub is_registered: bool,
    pub is_waitlisted: bool,
}

impl EventStatus {
    pub fn is_full(&self) -> bool {
        self.filled >= self.capacity
    }
}
