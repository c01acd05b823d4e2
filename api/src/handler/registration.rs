use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use kernel::model::id::{EventId, UserId};
use registry::AppRegistry;
use shared::error::AppResult;

use crate::{
    extractor::AuthorizedUser,
    model::registration::{
        EventStatusResponse, RegistrationStateResponse, WaitlistEntryResponse, WaitlistResponse,
    },
};

/// 登録要求。空き枠があれば登録、満員ならキャンセル待ちに入る
pub async fn register_for_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<(StatusCode, Json<RegistrationStateResponse>)> {
    registry
        .registration_service()
        .request_registration(&user.identity(), event_id)
        .await
        .map(RegistrationStateResponse::from)
        .map(|res| (StatusCode::CREATED, Json(res)))
}

pub async fn withdraw_registration(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .registration_service()
        .withdraw_registration(&user.identity(), event_id)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn leave_waitlist(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .registration_service()
        .leave_waitlist(&user.identity(), event_id)
        .await
        .map(|_| StatusCode::OK)
}

/// 管理者による強制取り消し。権限判定はサービス側で行う
pub async fn force_remove_registration(
    user: AuthorizedUser,
    Path((event_id, user_id)): Path<(EventId, UserId)>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .registration_service()
        .force_remove(&user.identity(), user_id, event_id)
        .await
        .map(|_| StatusCode::OK)
}

/// キャンセル待ちの一覧（管理者用）。権限判定はサービス側で行う
pub async fn show_waitlist(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<WaitlistResponse>> {
    registry
        .registration_service()
        .waitlist_roster(&user.identity(), event_id)
        .await
        .map(|entries| WaitlistResponse {
            items: entries
                .into_iter()
                .map(WaitlistEntryResponse::from)
                .collect(),
        })
        .map(Json)
}

pub async fn show_registration_status(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventStatusResponse>> {
    registry
        .registration_service()
        .event_status(&user.identity(), event_id)
        .await
        .map(EventStatusResponse::from)
        .map(Json)
}
