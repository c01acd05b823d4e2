use axum::{extract::State, http::StatusCode, Json};
use garde::Validate;
use kernel::model::auth::event::CreateToken;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::auth::{AccessTokenResponse, CurrentUserResponse, LoginRequest},
};

pub async fn login(
    State(registry): State<AppRegistry>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    req.validate(&())?;

    let user_id = registry
        .auth_repository()
        .verify_user(&req.email, &req.password)
        .await?;

    // ブロック中の利用者には新しいセッションを発行しない
    let user = registry
        .user_repository()
        .find_current_user(user_id)
        .await?
        .ok_or(AppError::UnauthenticatedError)?;
    if user.is_blocked {
        return Err(AppError::BlockedUserError);
    }

    let access_token = registry
        .auth_repository()
        .create_token(CreateToken::new(user_id))
        .await?;

    Ok(Json(AccessTokenResponse {
        user_id,
        access_token: access_token.0,
    }))
}

pub async fn logout(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .auth_repository()
        .delete_token(&user.access_token)
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

pub async fn show_current_login(user: AuthorizedUser) -> Json<CurrentUserResponse> {
    let is_admin = user.is_admin();
    Json(CurrentUserResponse {
        user_id: user.user.user_id,
        user_name: user.user.user_name,
        role: user.user.role.into(),
        is_admin,
    })
}
