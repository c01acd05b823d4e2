use chrono::{DateTime, Utc};
use kernel::model::{
    event::EventStatus,
    id::{EventId, UserId, WaitlistEntryId},
    registration::{RegistrationState, WaitlistEntry},
};
use serde::Serialize;

/// 登録要求の結果。登録できたか、キャンセル待ちに入ったかを返す
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStateResponse {
    pub state: RegistrationStateName,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationStateName {
    Unregistered,
    Registered,
    Waitlisted,
}

impl From<RegistrationState> for RegistrationStateResponse {
    fn from(value: RegistrationState) -> Self {
        let state = match value {
            RegistrationState::Unregistered => RegistrationStateName::Unregistered,
            RegistrationState::Registered => RegistrationStateName::Registered,
            RegistrationState::Waitlisted => RegistrationStateName::Waitlisted,
        };
        Self { state }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatusResponse {
    pub filled_spots: i32,
    pub capacity: i32,
    pub is_registered: bool,
    pub is_waitlisted: bool,
    pub is_full: bool,
}

impl From<EventStatus> for EventStatusResponse {
    fn from(value: EventStatus) -> Self {
        let is_full = value.is_full();
        let EventStatus {
            filled,
            capacity,
            is_registered,
            is_waitlisted,
        } = value;
        Self {
            filled_spots: filled,
            capacity,
            is_registered,
            is_waitlisted,
            is_full,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistResponse {
    pub items: Vec<WaitlistEntryResponse>,
}

/// キャンセル待ち 1 件分。配列の並びが FIFO 順
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntryResponse {
    pub waitlist_id: WaitlistEntryId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

impl From<WaitlistEntry> for WaitlistEntryResponse {
    fn from(value: WaitlistEntry) -> Self {
        let WaitlistEntry {
            waitlist_id,
            event_id,
            user_id,
            joined_at,
        } = value;
        Self {
            waitlist_id,
            event_id,
            user_id,
            joined_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_state_maps_to_response_name() {
        let res = RegistrationStateResponse::from(RegistrationState::Waitlisted);
        assert_eq!(res.state, RegistrationStateName::Waitlisted);
    }

    #[test]
    fn full_flag_is_derived_from_counts() {
        let status = EventStatus {
            filled: 3,
            capacity: 3,
            is_registered: false,
            is_waitlisted: true,
        };
        let res = EventStatusResponse::from(status);
        assert!(res.is_full);
        assert_eq!(res.filled_spots, 3);
    }
}
