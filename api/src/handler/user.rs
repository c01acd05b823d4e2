use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::id::UserId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::user::{
        CreateUserRequest, UpdateUserBlockRequest, UpdateUserBlockRequestWithUserId,
        UpdateUserProfileRequest, UpdateUserProfileRequestWithUserId, UpdateUserRoleRequest,
        UpdateUserRoleRequestWithUserId, UserProfileResponse, UserResponse, UsersResponse,
    },
};

/// アカウント作成。認証前でも呼び出せる
pub async fn register_user(
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfileResponse>)> {
    req.validate(&())?;

    registry
        .user_repository()
        .create(req.into())
        .await
        .map(UserProfileResponse::from)
        .map(|res| (StatusCode::CREATED, Json(res)))
}

pub async fn show_current_user(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<UserProfileResponse>> {
    registry
        .user_repository()
        .find_current_user(user.id())
        .await
        .and_then(|profile| match profile {
            Some(profile) => Ok(Json(profile.into())),
            None => Err(AppError::EntityNotFound("user not found".into())),
        })
}

pub async fn update_current_user(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateUserProfileRequest>,
) -> AppResult<StatusCode> {
    req.validate(&())?;

    let update = UpdateUserProfileRequestWithUserId::new(user.id(), req);
    registry
        .user_repository()
        .update_profile(update.into())
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_user_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<UsersResponse>> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    registry
        .user_repository()
        .find_all()
        .await
        .map(|users| UsersResponse {
            items: users.into_iter().map(UserResponse::from).collect(),
        })
        .map(Json)
}

pub async fn update_user_role(
    user: AuthorizedUser,
    Path(user_id): Path<UserId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateUserRoleRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    let update = UpdateUserRoleRequestWithUserId::new(user_id, req);
    registry
        .user_repository()
        .update_role(update.into())
        .await
        .map(|_| StatusCode::OK)
}

/// ブロックリストへの追加・解除。次回のトークン検証時にセッションが破棄される
pub async fn update_user_block(
    user: AuthorizedUser,
    Path(user_id): Path<UserId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateUserBlockRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::UnauthorizedError);
    }

    let update = UpdateUserBlockRequestWithUserId::new(user_id, req);
    registry
        .user_repository()
        .update_block(update.into())
        .await
        .map(|_| StatusCode::OK)
}
