use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::EventStatus,
    id::{EventId, RegistrationId, UserId, WaitlistEntryId},
    registration::{ClaimResult, WaitlistEntry},
};
use kernel::repository::registration::RegistrationRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::registration::{EventStatusRow, WaitlistRow},
    set_transaction_serializable, ConnectionPool,
};

/// SERIALIZABLE で衝突した場合の再試行回数
const MAX_CAPACITY_RETRIES: usize = 3;

#[derive(new)]
pub struct RegistrationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl RegistrationRepository for RegistrationRepositoryImpl {
    async fn try_claim_spot(&self, event_id: EventId, user_id: UserId) -> AppResult<ClaimResult> {
        let mut attempt = 0;
        loop {
            match self.try_claim_spot_once(event_id, user_id).await {
                Err(e) if is_serialization_failure(&e) => {
                    attempt += 1;
                    if attempt > MAX_CAPACITY_RETRIES {
                        return Err(AppError::CapacityConflictError);
                    }
                }
                other => return other,
            }
        }
    }

    async fn release_spot(&self, event_id: EventId, user_id: UserId) -> AppResult<bool> {
        let mut attempt = 0;
        loop {
            match self.release_spot_once(event_id, user_id).await {
                Err(e) if is_serialization_failure(&e) => {
                    attempt += 1;
                    if attempt > MAX_CAPACITY_RETRIES {
                        return Err(AppError::CapacityConflictError);
                    }
                }
                other => return other,
            }
        }
    }

    async fn enqueue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // イベントの存在確認。行ロックで登録系の操作と直列化する
        self.lock_event_row(&mut tx, event_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("イベント（{}）が見つかりませんでした。", event_id))
            })?;

        // 登録済みの利用者を待ち行列へ入れない（登録と待ちの排他）
        let registered: Option<(RegistrationId,)> = sqlx::query_as(
            r#"
                SELECT registration_id
                FROM event_registrations
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if registered.is_none() {
            // 既に並んでいる場合は何もしない（冪等）
            sqlx::query(
                r#"
                    INSERT INTO event_waitlists (waitlist_id, event_id, user_id, joined_at)
                    VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
                    ON CONFLICT (event_id, user_id) DO NOTHING
                "#,
            )
            .bind(WaitlistEntryId::new())
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn dequeue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<bool> {
        let res = sqlx::query(
            r#"
                DELETE FROM event_waitlists
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(res.rows_affected() > 0)
    }

    async fn promote_oldest(&self, event_id: EventId) -> AppResult<Option<UserId>> {
        let mut attempt = 0;
        loop {
            match self.promote_oldest_once(event_id).await {
                Err(e) if is_serialization_failure(&e) => {
                    attempt += 1;
                    if attempt > MAX_CAPACITY_RETRIES {
                        return Err(AppError::CapacityConflictError);
                    }
                }
                other => return other,
            }
        }
    }

    async fn find_status(&self, event_id: EventId, user_id: UserId) -> AppResult<EventStatus> {
        let row: Option<EventStatusRow> = sqlx::query_as(
            r#"
                SELECT
                    e.filled_spots,
                    e.capacity,
                    EXISTS(
                        SELECT 1 FROM event_registrations er
                        WHERE er.event_id = e.event_id AND er.user_id = $2
                    ) AS is_registered,
                    EXISTS(
                        SELECT 1 FROM event_waitlists ew
                        WHERE ew.event_id = e.event_id AND ew.user_id = $2
                    ) AS is_waitlisted
                FROM events e
                WHERE e.event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(EventStatus::from).ok_or_else(|| {
            AppError::EntityNotFound(format!("イベント（{}）が見つかりませんでした。", event_id))
        })
    }

    async fn find_waitlist(&self, event_id: EventId) -> AppResult<Vec<WaitlistEntry>> {
        sqlx::query_as::<_, WaitlistRow>(
            r#"
                SELECT waitlist_id, event_id, user_id, joined_at
                FROM event_waitlists
                WHERE event_id = $1
                ORDER BY joined_at ASC, position ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map(|rows| rows.into_iter().map(WaitlistEntry::from).collect())
        .map_err(AppError::SpecificOperationError)
    }
}

impl RegistrationRepositoryImpl {
    async fn try_claim_spot_once(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> AppResult<ClaimResult> {
        let mut tx = self.db.begin().await?;
        set_transaction_serializable(&mut tx).await?;

        // イベント行のロックが同一イベントへの定員操作を直列化する。
        // ロック取得からコミットまでの間、filled_spots は他から変更されない
        let (filled, capacity) = self
            .lock_event_row(&mut tx, event_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("イベント（{}）が見つかりませんでした。", event_id))
            })?;

        let registered: Option<(RegistrationId,)> = sqlx::query_as(
            r#"
                SELECT registration_id
                FROM event_registrations
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if registered.is_some() {
            return Ok(ClaimResult::AlreadyRegistered);
        }

        if filled >= capacity {
            return Ok(ClaimResult::Full);
        }

        // 登録レコードの作成とカウンタの加算は必ず同一トランザクション内で行う
        self.insert_registration(&mut tx, event_id, user_id).await?;
        self.increment_filled_spots(&mut tx, event_id).await?;

        // 並んでいた利用者が直接登録できた場合、待ちエントリは同一
        // トランザクション内で消す（登録と待ちの排他）
        sqlx::query(
            r#"
                DELETE FROM event_waitlists
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(ClaimResult::Claimed)
    }

    async fn release_spot_once(&self, event_id: EventId, user_id: UserId) -> AppResult<bool> {
        let mut tx = self.db.begin().await?;
        set_transaction_serializable(&mut tx).await?;

        self.lock_event_row(&mut tx, event_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("イベント（{}）が見つかりませんでした。", event_id))
            })?;

        let res = sqlx::query(
            r#"
                DELETE FROM event_registrations
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        // 登録が無ければカウンタも動かさない（冪等な取り消し）
        if res.rows_affected() < 1 {
            return Ok(false);
        }

        sqlx::query(
            r#"
                UPDATE events
                SET filled_spots = GREATEST(0, filled_spots - 1)
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(true)
    }

    async fn promote_oldest_once(&self, event_id: EventId) -> AppResult<Option<UserId>> {
        let mut tx = self.db.begin().await?;
        set_transaction_serializable(&mut tx).await?;

        // イベントが既に削除されていた場合、繰り上げる対象もない
        let Some((filled, capacity)) = self.lock_event_row(&mut tx, event_id).await? else {
            return Ok(None);
        };

        if filled >= capacity {
            return Ok(None);
        }

        // FIFO。joined_at の同時刻は挿入順（position）で決める。
        // 行ロックにより、自発的な離脱（dequeue）とは衝突しない
        let head: Option<WaitlistRow> = sqlx::query_as(
            r#"
                SELECT waitlist_id, event_id, user_id, joined_at
                FROM event_waitlists
                WHERE event_id = $1
                ORDER BY joined_at ASC, position ASC
                LIMIT 1
                FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(head) = head else {
            return Ok(None);
        };

        // 待ちエントリ 1 件の削除と登録 1 件の作成、カウンタ加算を
        // 1 トランザクションで行う。空いた枠 1 つに対する昇格は最大 1 名
        self.insert_registration(&mut tx, event_id, head.user_id)
            .await?;
        self.increment_filled_spots(&mut tx, event_id).await?;

        let res = sqlx::query(
            r#"
                DELETE FROM event_waitlists
                WHERE waitlist_id = $1
            "#,
        )
        .bind(head.waitlist_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No waitlist entry has been deleted".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(Some(head.user_id))
    }

    /// イベント行を FOR UPDATE で取得する。存在しない場合は None
    async fn lock_event_row(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: EventId,
    ) -> AppResult<Option<(i32, i32)>> {
        let row: Option<(i32, i32)> = sqlx::query_as(
            r#"
                SELECT filled_spots, capacity
                FROM events
                WHERE event_id = $1
                FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
        Ok(row)
    }

    async fn insert_registration(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: EventId,
        user_id: UserId,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                INSERT INTO event_registrations (registration_id, event_id, user_id, registered_at)
                VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(RegistrationId::new())
        .bind(event_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No registration record has been created".into(),
            ));
        }
        Ok(())
    }

    async fn increment_filled_spots(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: EventId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
                UPDATE events
                SET filled_spots = filled_spots + 1
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }
}

/// SQLSTATE 40001 (serialization_failure) かどうか
fn is_serialization_failure(e: &AppError) -> bool {
    match e {
        AppError::SpecificOperationError(sqlx::Error::Database(db))
        | AppError::TransactionError(sqlx::Error::Database(db)) => {
            db.code().as_deref() == Some("40001")
        }
        _ => false,
    }
}
