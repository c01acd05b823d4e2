use crate::model::{id::UserId, role::Role};

pub mod event;

/// Redis に保存するアクセストークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

/// リクエストを発行した利用者の解決済み情報。
/// コア操作はセッションなどの暗黙の状態を読まず、必ずこの値を受け取る
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
