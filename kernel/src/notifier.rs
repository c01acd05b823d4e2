use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::id::{EventId, UserId};

/// 状態遷移時に利用者へ送る通知の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// 登録が確定した
    Registered,
    /// キャンセル待ちから繰り上がった
    Promoted,
}

#[derive(Debug, Clone, Copy)]
pub struct Notification {
    pub user_id: UserId,
    pub event_id: EventId,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(user_id: UserId, event_id: EventId, kind: NotificationKind) -> Self {
        Self {
            user_id,
            event_id,
            kind,
        }
    }
}

/// 通知の送出口。実装はキュー投入のみ行い、配送はバックグラウンドで行う。
/// 配送失敗は呼び出し元の操作を失敗させてはならない
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> AppResult<()>;
}
