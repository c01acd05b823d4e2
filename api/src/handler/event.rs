use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{event::event::DeleteEvent, id::EventId};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        event::{
            CreateEventRequest, EventResponse, EventSpotsResponse, EventWithStatusResponse,
            EventsResponse, PastEventsResponse, UpdateEventRequest, UpdateEventRequestWithIds,
        },
        user::{AttendeeEmailsResponse, AttendeeResponse, AttendeesResponse},
    },
};

pub async fn register_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }
    req.validate(&())?;

    registry
        .event_repository()
        .create(req.into())
        .await
        .map(|_| StatusCode::CREATED)
}

pub async fn show_event_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    registry
        .event_repository()
        .find_upcoming_all(user.id())
        .await
        .map(to_events_response)
        .map(Json)
}

pub async fn show_sponsored_event_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    registry
        .event_repository()
        .find_sponsored(user.id())
        .await
        .map(to_events_response)
        .map(Json)
}

pub async fn show_past_event_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PastEventsResponse>> {
    registry
        .event_repository()
        .find_past_all()
        .await
        .map(|events| PastEventsResponse {
            items: events.into_iter().map(EventResponse::from).collect(),
        })
        .map(Json)
}

/// 利用者が登録済みまたはキャンセル待ちのイベント一覧
pub async fn show_engaged_event_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    registry
        .event_repository()
        .find_engaged_by_user_id(user.id())
        .await
        .map(to_events_response)
        .map(Json)
}

pub async fn show_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventWithStatusResponse>> {
    registry
        .event_repository()
        .find_by_id(event_id, user.id())
        .await
        .and_then(|event| match event {
            Some(event) => Ok(Json(event.into())),
            None => Err(AppError::EntityNotFound("event not found".into())),
        })
}

/// 定員台帳の読み取り。利用者ごとの状態フラグを含まない軽い応答
pub async fn show_event_spots(
    _user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventSpotsResponse>> {
    registry
        .event_repository()
        .find_spots(event_id)
        .await
        .map(EventSpotsResponse::from)
        .map(Json)
}

pub async fn update_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }
    req.validate(&())?;

    let update_event = UpdateEventRequestWithIds::new(event_id, user.id(), req);
    registry
        .event_repository()
        .update(update_event.into())
        .await
        .map(|_| StatusCode::OK)
}

pub async fn delete_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    let delete_event = DeleteEvent {
        event_id,
        requested_user: user.id(),
    };
    registry
        .event_repository()
        .delete(delete_event)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_attendee_list(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AttendeesResponse>> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    registry
        .event_repository()
        .find_attendees(event_id)
        .await
        .map(|attendees| AttendeesResponse {
            items: attendees.into_iter().map(AttendeeResponse::from).collect(),
        })
        .map(Json)
}

pub async fn show_attendee_emails(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AttendeeEmailsResponse>> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    registry
        .event_repository()
        .find_attendees(event_id)
        .await
        .map(AttendeeEmailsResponse::from)
        .map(Json)
}

fn to_events_response(events: Vec<kernel::model::event::EventWithStatus>) -> EventsResponse {
    EventsResponse {
        items: events
            .into_iter()
            .map(EventWithStatusResponse::from)
            .collect(),
    }
}
