use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use kernel::model::{
    auth::{AccessToken, CallerIdentity},
    id::UserId,
    role::Role,
    user::UserProfile,
};
use kernel::repository::{auth::AuthRepository, user::UserRepository};
use registry::AppRegistry;
use shared::error::AppError;

/// Authorization ヘッダのトークンを検証し、解決済みの利用者を取り出す。
/// ブロック中の利用者はここでセッションを破棄して弾く
pub struct AuthorizedUser {
    pub access_token: AccessToken,
    pub user: UserProfile,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.user.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity::new(self.user.user_id, self.user.role)
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        let access_token = extract_bearer_token(parts).ok_or(AppError::UnauthenticatedError)?;
        resolve_user(
            registry.auth_repository(),
            registry.user_repository(),
            access_token,
        )
        .await
    }
}

/// トークンから利用者を解決する。
/// ブロック中の利用者はトークンを削除した上で拒否する
async fn resolve_user(
    auth_repository: Arc<dyn AuthRepository>,
    user_repository: Arc<dyn UserRepository>,
    access_token: AccessToken,
) -> Result<AuthorizedUser, AppError> {
    let user_id = auth_repository
        .fetch_user_id_from_token(&access_token)
        .await?
        .ok_or(AppError::UnauthenticatedError)?;

    let user = user_repository
        .find_current_user(user_id)
        .await?
        .ok_or(AppError::UnauthenticatedError)?;

    if user.is_blocked {
        auth_repository.delete_token(&access_token).await?;
        return Err(AppError::BlockedUserError);
    }

    Ok(AuthorizedUser { access_token, user })
}

fn extract_bearer_token(parts: &Parts) -> Option<AccessToken> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| AccessToken(token.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kernel::model::auth::event::CreateToken;
    use kernel::model::user::{
        event::{CreateUser, UpdateUserBlock, UpdateUserProfile, UpdateUserRole},
        User,
    };
    use shared::error::AppResult;

    use super::*;

    struct FakeAuthRepository {
        user_id: UserId,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeAuthRepository {
        fn new(user_id: UserId) -> Self {
            Self {
                user_id,
                deleted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuthRepository for FakeAuthRepository {
        async fn fetch_user_id_from_token(
            &self,
            _access_token: &AccessToken,
        ) -> AppResult<Option<UserId>> {
            Ok(Some(self.user_id))
        }

        async fn verify_user(&self, _email: &str, _password: &str) -> AppResult<UserId> {
            Ok(self.user_id)
        }

        async fn create_token(&self, _event: CreateToken) -> AppResult<AccessToken> {
            Ok(AccessToken("token".into()))
        }

        async fn delete_token(&self, access_token: &AccessToken) -> AppResult<()> {
            self.deleted.lock().unwrap().push(access_token.0.clone());
            Ok(())
        }
    }

    struct FakeUserRepository {
        user_id: UserId,
        is_blocked: bool,
    }

    impl FakeUserRepository {
        fn profile(&self) -> UserProfile {
            UserProfile {
                user_id: self.user_id,
                user_name: "Dana".into(),
                email: "dana@example.com".into(),
                role: Role::User,
                is_blocked: self.is_blocked,
                address: None,
                pronouns: None,
                phone_number: None,
                interests: None,
            }
        }
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn create(&self, _event: CreateUser) -> AppResult<UserProfile> {
            Ok(self.profile())
        }

        async fn find_current_user(&self, _user_id: UserId) -> AppResult<Option<UserProfile>> {
            Ok(Some(self.profile()))
        }

        async fn find_by_email(&self, _email: &str) -> AppResult<Option<User>> {
            Ok(None)
        }

        async fn find_all(&self) -> AppResult<Vec<User>> {
            Ok(Vec::new())
        }

        async fn update_profile(&self, _event: UpdateUserProfile) -> AppResult<()> {
            Ok(())
        }

        async fn update_role(&self, _event: UpdateUserRole) -> AppResult<()> {
            Ok(())
        }

        async fn update_block(&self, _event: UpdateUserBlock) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn blocked_user_is_rejected_and_session_is_invalidated() {
        let user_id = UserId::new();
        let auth = Arc::new(FakeAuthRepository::new(user_id));
        let users = Arc::new(FakeUserRepository {
            user_id,
            is_blocked: true,
        });

        let result = resolve_user(
            auth.clone(),
            users,
            AccessToken("blocked-token".into()),
        )
        .await;

        assert!(matches!(result, Err(AppError::BlockedUserError)));
        // 有効だったトークンはその場で破棄される
        assert_eq!(
            *auth.deleted.lock().unwrap(),
            vec!["blocked-token".to_string()]
        );
    }

    #[tokio::test]
    async fn active_user_keeps_the_session() {
        let user_id = UserId::new();
        let auth = Arc::new(FakeAuthRepository::new(user_id));
        let users = Arc::new(FakeUserRepository {
            user_id,
            is_blocked: false,
        });

        let result = resolve_user(auth.clone(), users, AccessToken("valid-token".into())).await;

        let user = result.expect("active user should resolve");
        assert_eq!(user.id(), user_id);
        assert!(auth.deleted.lock().unwrap().is_empty());
    }
}
