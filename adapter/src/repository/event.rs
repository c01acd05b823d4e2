use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::{
        event::{CreateEvent, DeleteEvent, UpdateEvent},
        Event, EventSpots, EventWithStatus,
    },
    id::{EventId, UserId},
    user::EventAttendee,
};
use kernel::repository::event::EventRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::{
        event::{EventRow, EventSpotsRow, EventWithStatusRow},
        user::AttendeeRow,
    },
    ConnectionPool,
};

/// 一覧系クエリの共通 SELECT 句。
/// 利用者から見た状態フラグは LEFT JOIN で求める
const EVENT_WITH_STATUS_COLUMNS: &str = r#"
    SELECT DISTINCT
        e.event_id,
        e.event_name,
        e.event_desc,
        e.start_time,
        e.end_time,
        e.capacity,
        e.filled_spots,
        e.location,
        e.is_sponsored,
        (er.user_id IS NOT NULL) AS is_registered,
        (ew.user_id IS NOT NULL) AS is_waitlisted,
        (e.filled_spots >= e.capacity) AS is_full,
        (e.end_time < CURRENT_TIMESTAMP) AS in_past
    FROM events e
    LEFT JOIN event_registrations er
        ON e.event_id = er.event_id AND er.user_id = $1
    LEFT JOIN event_waitlists ew
        ON e.event_id = ew.event_id AND ew.user_id = $1
"#;

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        if event.capacity < 1 {
            return Err(AppError::UnprocessableEntity(
                "定員は 1 以上で指定してください。".into(),
            ));
        }
        if event.end_time <= event.start_time {
            return Err(AppError::UnprocessableEntity(
                "終了時刻は開始時刻より後にしてください。".into(),
            ));
        }

        let event_id = EventId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO events
                (event_id, event_name, event_desc, start_time, end_time,
                 capacity, filled_spots, location, is_sponsored)
                VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8)
            "#,
        )
        .bind(event_id)
        .bind(&event.event_name)
        .bind(&event.event_desc)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.capacity)
        .bind(&event.location)
        .bind(event.is_sponsored)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been created".into(),
            ));
        }

        Ok(event_id)
    }

    async fn find_upcoming_all(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>> {
        let sql = format!(
            "{EVENT_WITH_STATUS_COLUMNS} WHERE e.end_time > CURRENT_TIMESTAMP ORDER BY e.start_time ASC"
        );
        self.fetch_with_status(&sql, user_id).await
    }

    async fn find_sponsored(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>> {
        let sql = format!(
            "{EVENT_WITH_STATUS_COLUMNS} WHERE e.end_time > CURRENT_TIMESTAMP AND e.is_sponsored ORDER BY e.start_time ASC"
        );
        self.fetch_with_status(&sql, user_id).await
    }

    async fn find_past_all(&self) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, EventRow>(
            r#"
                SELECT
                    event_id, event_name, event_desc, start_time, end_time,
                    capacity, filled_spots, location, is_sponsored
                FROM events
                WHERE end_time < CURRENT_TIMESTAMP
                ORDER BY end_time DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map(|rows| rows.into_iter().map(Event::from).collect())
        .map_err(AppError::SpecificOperationError)
    }

    async fn find_engaged_by_user_id(&self, user_id: UserId) -> AppResult<Vec<EventWithStatus>> {
        let sql = format!(
            "{EVENT_WITH_STATUS_COLUMNS} WHERE er.user_id = $1 OR ew.user_id = $1 ORDER BY e.end_time DESC"
        );
        self.fetch_with_status(&sql, user_id).await
    }

    async fn find_by_id(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> AppResult<Option<EventWithStatus>> {
        let sql = format!("{EVENT_WITH_STATUS_COLUMNS} WHERE e.event_id = $2");
        let row: Option<EventWithStatusRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(event_id)
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(row.map(EventWithStatus::from))
    }

    async fn find_spots(&self, event_id: EventId) -> AppResult<EventSpots> {
        let row: Option<EventSpotsRow> = sqlx::query_as(
            r#"
                SELECT filled_spots, capacity
                FROM events
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(EventSpots::from).ok_or_else(|| {
            AppError::EntityNotFound(format!("イベント（{}）が見つかりませんでした。", event_id))
        })
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // 事前チェック:
        // - 対象イベントが存在するか
        // - 定員を縮める場合、現在の登録数を下回らないか
        {
            let current: Option<EventSpotsRow> = sqlx::query_as(
                r#"
                    SELECT filled_spots, capacity
                    FROM events
                    WHERE event_id = $1
                    FOR UPDATE
                "#,
            )
            .bind(event.event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let Some(current) = current else {
                return Err(AppError::EntityNotFound(format!(
                    "イベント（{}）が見つかりませんでした。",
                    event.event_id
                )));
            };

            if let Some(capacity) = event.capacity {
                if capacity < current.filled_spots {
                    return Err(AppError::UnprocessableEntity(format!(
                        "定員（{}）を現在の登録数（{}）未満にはできません。",
                        capacity, current.filled_spots
                    )));
                }
            }
        }

        let res = sqlx::query(
            r#"
                UPDATE events
                SET
                    event_name = COALESCE($2, event_name),
                    event_desc = COALESCE($3, event_desc),
                    start_time = COALESCE($4, start_time),
                    end_time = COALESCE($5, end_time),
                    capacity = COALESCE($6, capacity),
                    location = COALESCE($7, location),
                    is_sponsored = COALESCE($8, is_sponsored)
                WHERE event_id = $1
            "#,
        )
        .bind(event.event_id)
        .bind(event.event_name)
        .bind(event.event_desc)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.capacity)
        .bind(event.location)
        .bind(event.is_sponsored)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // イベント削除は登録・キャンセル待ちへカスケードする
    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM event_waitlists WHERE event_id = $1")
            .bind(event.event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        sqlx::query("DELETE FROM event_registrations WHERE event_id = $1")
            .bind(event.event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        let res = sqlx::query("DELETE FROM events WHERE event_id = $1")
            .bind(event.event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "イベント（{}）が見つかりませんでした。",
                event.event_id
            )));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn find_attendees(&self, event_id: EventId) -> AppResult<Vec<EventAttendee>> {
        sqlx::query_as::<_, AttendeeRow>(
            r#"
                SELECT u.user_id, u.user_name, u.email
                FROM users u
                INNER JOIN event_registrations er ON u.user_id = er.user_id
                WHERE er.event_id = $1
                ORDER BY er.registered_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map(|rows| rows.into_iter().map(EventAttendee::from).collect())
        .map_err(AppError::SpecificOperationError)
    }
}

impl EventRepositoryImpl {
    async fn fetch_with_status(
        &self,
        sql: &str,
        user_id: UserId,
    ) -> AppResult<Vec<EventWithStatus>> {
        sqlx::query_as::<_, EventWithStatusRow>(sql)
            .bind(user_id)
            .fetch_all(self.db.inner_ref())
            .await
            .map(|rows| rows.into_iter().map(EventWithStatus::from).collect())
            .map_err(AppError::SpecificOperationError)
    }
}
