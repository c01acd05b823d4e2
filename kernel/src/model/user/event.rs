use crate::model::{id::UserId, role::Role};

pub struct CreateUser {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub address: Option<String>,
    pub pronouns: Option<String>,
    pub phone_number: Option<String>,
    pub interests: Option<String>,
}

pub struct UpdateUserProfile {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub address: Option<String>,
    pub pronouns: Option<String>,
    pub phone_number: Option<String>,
    pub interests: Option<String>,
}

pub struct UpdateUserRole {
    pub user_id: UserId,
    pub role: Role,
}

/// ブロックリストへの追加・解除
pub struct UpdateUserBlock {
    pub user_id: UserId,
    pub is_blocked: bool,
}
