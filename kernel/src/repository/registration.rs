use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    event::EventStatus,
    id::{EventId, UserId},
    registration::{ClaimResult, WaitlistEntry},
};

/// 登録・キャンセル待ちの永続化操作。
///
/// 各メソッドはそれぞれ 1 つのトランザクションとして実行され、
/// 定員カウンタの増減は登録レコードの作成・削除と必ず同一
/// トランザクション内で行われる。
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// 空き枠があれば登録レコードを作成し filled_spots を 1 増やす。
    /// イベント行をロックして判定するため、同一イベントへの操作は直列化される
    async fn try_claim_spot(&self, event_id: EventId, user_id: UserId) -> AppResult<ClaimResult>;

    /// 登録レコードを削除し filled_spots を 1 減らす（下限 0）。
    /// レコードが存在しなかった場合は何もせず false を返す
    async fn release_spot(&self, event_id: EventId, user_id: UserId) -> AppResult<bool>;

    /// キャンセル待ちへ追加する。既に並んでいる場合は何もしない
    async fn enqueue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<()>;

    /// キャンセル待ちから自発的に抜ける。並んでいなかった場合は false を返す
    async fn dequeue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<bool>;

    /// 空き枠がある場合のみ、最も早く並んだ 1 名を登録へ昇格させる。
    /// 昇格した利用者の ID を返す。待ち行列が空、または満員なら None
    async fn promote_oldest(&self, event_id: EventId) -> AppResult<Option<UserId>>;

    /// 利用者から見たイベントの登録状況を返す
    async fn find_status(&self, event_id: EventId, user_id: UserId) -> AppResult<EventStatus>;

    /// イベントのキャンセル待ち一覧（並び順）を返す
    async fn find_waitlist(&self, event_id: EventId) -> AppResult<Vec<WaitlistEntry>>;
}
