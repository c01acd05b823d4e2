use garde::Validate;
use kernel::model::id::UserId;
use serde::{Deserialize, Serialize};

use crate::model::user::RoleName;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub user_id: UserId,
    pub access_token: String,
}

/// ログイン中の利用者のサマリ
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub role: RoleName,
    pub is_admin: bool,
}
