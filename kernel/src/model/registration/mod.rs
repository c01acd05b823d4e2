use chrono::{DateTime, Utc};

use crate::model::id::{EventId, UserId, WaitlistEntryId};

/// (利用者, イベント) の組に対する登録状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
    Waitlisted,
}

/// 空き枠確保トランザクションの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// 枠を確保し、登録レコードを作成した
    Claimed,
    /// すでに登録済みだった。台帳は変更していない
    AlreadyRegistered,
    /// 満員のため確保できなかった
    Full,
}

#[derive(Debug)]
pub struct WaitlistEntry {
    pub waitlist_id: WaitlistEntryId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}
