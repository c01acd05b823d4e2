use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event, EventSpots, EventWithStatus,
    },
    id::{EventId, UserId},
    user::EventAttendee,
};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId>;
    // 開催前・開催中のイベント一覧を、利用者から見た状態フラグつきで返す
    async fn find_upcoming_all(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>>;
    // 主催者協賛イベントのみの一覧
    async fn find_sponsored(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>>;
    // 終了済みイベントの一覧
    async fn find_past_all(&self) -> AppResult<Vec<Event>>;
    // 利用者が登録済みまたはキャンセル待ちのイベント一覧
    async fn find_engaged_by_user_id(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>>;
    async fn find_by_id(&self, event_id: EventId, user_id: UserId)
        -> AppResult<Option<EventWithStatus>>;
    // 定員台帳の読み取り
    async fn find_spots(&self, event_id: EventId) -> AppResult<EventSpots>;
    async fn update(&self, event: UpdateEvent) -> AppResult<()>;
    // 削除は登録・キャンセル待ちへカスケードする
    async fn delete(&self, event: DeleteEvent) -> AppResult<()>;
    // イベントの登録者一覧（管理者用）
    async fn find_attendees(&self, event_id: EventId) -> AppResult<Vec<EventAttendee>>;
}
