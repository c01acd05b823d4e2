use std::str::FromStr;

use kernel::model::{
    id::UserId,
    role::Role,
    user::{EventAttendee, User, UserProfile},
};
use shared::error::AppError;

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub is_blocked: bool,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        let UserRow {
            user_id,
            user_name,
            email,
            role,
            is_blocked,
        } = value;
        Ok(User {
            user_id,
            user_name,
            email,
            role: Role::from_str(&role)
                .map_err(|e| AppError::ConversionEntityError(e.to_string()))?,
            is_blocked,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct UserProfileRow {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: String,
    pub is_blocked: bool,
    pub address: Option<String>,
    pub pronouns: Option<String>,
    pub phone_number: Option<String>,
    pub interests: Option<String>,
}

impl TryFrom<UserProfileRow> for UserProfile {
    type Error = AppError;

    fn try_from(value: UserProfileRow) -> Result<Self, Self::Error> {
        let UserProfileRow {
            user_id,
            user_name,
            email,
            role,
            is_blocked,
            address,
            pronouns,
            phone_number,
            interests,
        } = value;
        Ok(UserProfile {
            user_id,
            user_name,
            email,
            role: Role::from_str(&role)
                .map_err(|e| AppError::ConversionEntityError(e.to_string()))?,
            is_blocked,
            address,
            pronouns,
            phone_number,
            interests,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct AttendeeRow {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<AttendeeRow> for EventAttendee {
    fn from(value: AttendeeRow) -> Self {
        let AttendeeRow {
            user_id,
            user_name,
            email,
        } = value;
        EventAttendee {
            user_id,
            user_name,
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_row_converts_role_string() {
        let row = UserRow {
            user_id: UserId::new(),
            user_name: "Dana".into(),
            email: "dana@example.com".into(),
            role: "Admin".into(),
            is_blocked: false,
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn unknown_role_string_is_a_conversion_error() {
        let row = UserRow {
            user_id: UserId::new(),
            user_name: "Dana".into(),
            email: "dana@example.com".into(),
            role: "Moderator".into(),
            is_blocked: false,
        };
        assert!(matches!(
            User::try_from(row),
            Err(AppError::ConversionEntityError(_))
        ));
    }
}
