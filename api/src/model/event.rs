use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    event::{
        event::{CreateEvent, UpdateEvent},
        Event, EventSpots, EventWithStatus,
    },
    id::{EventId, UserId},
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[garde(length(min = 1))]
    pub event_name: String,
    #[garde(skip)]
    pub event_desc: String,
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
    #[garde(range(min = 1))]
    pub capacity: i32,
    #[garde(length(min = 1))]
    pub location: String,
    #[garde(skip)]
    pub is_sponsored: bool,
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(value: CreateEventRequest) -> Self {
        let CreateEventRequest {
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            location,
            is_sponsored,
        } = value;
        CreateEvent {
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            location,
            is_sponsored,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[garde(inner(length(min = 1)))]
    pub event_name: Option<String>,
    #[garde(skip)]
    pub event_desc: Option<String>,
    #[garde(skip)]
    pub start_time: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub end_time: Option<DateTime<Utc>>,
    #[garde(inner(range(min = 1)))]
    pub capacity: Option<i32>,
    #[garde(inner(length(min = 1)))]
    pub location: Option<String>,
    #[garde(skip)]
    pub is_sponsored: Option<bool>,
}

#[derive(new)]
pub struct UpdateEventRequestWithIds(EventId, UserId, UpdateEventRequest);

impl From<UpdateEventRequestWithIds> for UpdateEvent {
    fn from(value: UpdateEventRequestWithIds) -> Self {
        let UpdateEventRequestWithIds(
            event_id,
            requested_user,
            UpdateEventRequest {
                event_name,
                event_desc,
                start_time,
                end_time,
                capacity,
                location,
                is_sponsored,
            },
        ) = value;
        UpdateEvent {
            event_id,
            event_name,
            event_desc,
            start_time,
            end_time,
            capacity,
            location,
            is_sponsored,
            requested_user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
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

impl From<Event> for EventResponse {
    fn from(value: Event) -> Self {
        let Event {
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
        Self {
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

/// イベント情報に、リクエストした利用者から見た状態フラグを添えた応答
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithStatusResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub is_registered: bool,
    pub is_waitlisted: bool,
    pub is_full: bool,
    pub in_past: bool,
}

impl From<EventWithStatus> for EventWithStatusResponse {
    fn from(value: EventWithStatus) -> Self {
        let EventWithStatus {
            event,
            is_registered,
            is_waitlisted,
            is_full,
            in_past,
        } = value;
        Self {
            event: EventResponse::from(event),
            is_registered,
            is_waitlisted,
            is_full,
            in_past,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub items: Vec<EventWithStatusResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastEventsResponse {
    pub items: Vec<EventResponse>,
}

/// 定員台帳の読み取り結果
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSpotsResponse {
    pub filled_spots: i32,
    pub capacity: i32,
    pub is_full: bool,
}

impl From<EventSpots> for EventSpotsResponse {
    fn from(value: EventSpots) -> Self {
        Self {
            filled_spots: value.filled,
            capacity: value.capacity,
            is_full: value.is_full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spots_response_derives_full_flag() {
        let res = EventSpotsResponse::from(EventSpots {
            filled: 5,
            capacity: 5,
        });
        assert!(res.is_full);

        let res = EventSpotsResponse::from(EventSpots {
            filled: 4,
            capacity: 5,
        });
        assert!(!res.is_full);
    }
}
