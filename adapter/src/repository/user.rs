use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::UserId,
    user::{
        event::{CreateUser, UpdateUserBlock, UpdateUserProfile, UpdateUserRole},
        User, UserProfile,
    },
};
use kernel::repository::user::UserRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::user::{UserProfileRow, UserRow},
    ConnectionPool,
};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, event: CreateUser) -> AppResult<UserProfile> {
        let user_id = UserId::new();
        let hashed_password = bcrypt::hash(&event.password, bcrypt::DEFAULT_COST)?;

        let row: UserProfileRow = sqlx::query_as(
            r#"
                INSERT INTO users
                (user_id, user_name, email, password_hash, role, is_blocked,
                 address, pronouns, phone_number, interests)
                VALUES ($1, $2, $3, $4, 'User', false, $5, $6, $7, $8)
                RETURNING
                    user_id, user_name, email, role, is_blocked,
                    address, pronouns, phone_number, interests
            "#,
        )
        .bind(user_id)
        .bind(&event.user_name)
        .bind(&event.email)
        .bind(&hashed_password)
        .bind(&event.address)
        .bind(&event.pronouns)
        .bind(&event.phone_number)
        .bind(&event.interests)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::UnprocessableEntity(format!(
                    "メールアドレス（{}）は既に登録されています。",
                    event.email
                ))
            }
            _ => AppError::SpecificOperationError(e),
        })?;

        UserProfile::try_from(row)
    }

    async fn find_current_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        let row: Option<UserProfileRow> = sqlx::query_as(
            r#"
                SELECT
                    user_id, user_name, email, role, is_blocked,
                    address, pronouns, phone_number, interests
                FROM users
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
                SELECT user_id, user_name, email, role, is_blocked
                FROM users
                WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(User::try_from).transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
                SELECT user_id, user_name, email, role, is_blocked
                FROM users
                ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE users
                SET
                    user_name = COALESCE($2, user_name),
                    address = COALESCE($3, address),
                    pronouns = COALESCE($4, pronouns),
                    phone_number = COALESCE($5, phone_number),
                    interests = COALESCE($6, interests)
                WHERE user_id = $1
            "#,
        )
        .bind(event.user_id)
        .bind(event.user_name)
        .bind(event.address)
        .bind(event.pronouns)
        .bind(event.phone_number)
        .bind(event.interests)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified user not found".into(),
            ));
        }
        Ok(())
    }

    async fn update_role(&self, event: UpdateUserRole) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE users
                SET role = $2
                WHERE user_id = $1
            "#,
        )
        .bind(event.user_id)
        .bind(event.role.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified user not found".into(),
            ));
        }
        Ok(())
    }

    async fn update_block(&self, event: UpdateUserBlock) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE users
                SET is_blocked = $2
                WHERE user_id = $1
            "#,
        )
        .bind(event.user_id)
        .bind(event.is_blocked)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified user not found".into(),
            ));
        }
        Ok(())
    }
}
