use crate::model::{id::UserId, role::Role};

pub mod event;

#[derive(Debug, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub is_blocked: bool,
}

/// プロフィール属性込みの利用者情報
#[derive(Debug)]
pub struct UserProfile {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    pub is_blocked: bool,
    pub address: Option<String>,
    pub pronouns: Option<String>,
    pub phone_number: Option<String>,
    pub interests: Option<String>,
}

/// イベント参加者一覧に表示する利用者情報
#[derive(Debug)]
pub struct EventAttendee {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}
