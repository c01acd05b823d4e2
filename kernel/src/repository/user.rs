use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::UserId,
    user::{
        event::{CreateUser, UpdateUserBlock, UpdateUserProfile, UpdateUserRole},
        User, UserProfile,
    },
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, event: CreateUser) -> AppResult<UserProfile>;
    async fn find_current_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_all(&self) -> AppResult<Vec<User>>;
    async fn update_profile(&self, event: UpdateUserProfile) -> AppResult<()>;
    async fn update_role(&self, event: UpdateUserRole) -> AppResult<()>;
    async fn update_block(&self, event: UpdateUserBlock) -> AppResult<()>;
}
