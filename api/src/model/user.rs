use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::UserId,
    role::Role,
    user::{
        event::{CreateUser, UpdateUserBlock, UpdateUserProfile, UpdateUserRole},
        EventAttendee, User, UserProfile,
    },
};
use serde::{Deserialize, Serialize};
use strum::VariantNames;

#[derive(Serialize, Deserialize, VariantNames)]
#[strum(serialize_all = "kebab-case")]
pub enum RoleName {
    Admin,
    User,
}

impl From<Role> for RoleName {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => Self::Admin,
            Role::User => Self::User,
        }
    }
}

impl From<RoleName> for Role {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Admin => Self::Admin,
            RoleName::User => Self::User,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[garde(length(min = 1))]
    user_name: String,
    #[garde(email)]
    email: String,
    #[garde(length(min = 8))]
    password: String,
    #[garde(skip)]
    address: Option<String>,
    #[garde(skip)]
    pronouns: Option<String>,
    #[garde(skip)]
    phone_number: Option<String>,
    #[garde(skip)]
    interests: Option<String>,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(value: CreateUserRequest) -> Self {
        let CreateUserRequest {
            user_name,
            email,
            password,
            address,
            pronouns,
            phone_number,
            interests,
        } = value;
        Self {
            user_name,
            email,
            password,
            address,
            pronouns,
            phone_number,
            interests,
        }
    }
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserProfileRequest {
    #[garde(inner(length(min = 1)))]
    user_name: Option<String>,
    #[garde(skip)]
    address: Option<String>,
    #[garde(skip)]
    pronouns: Option<String>,
    #[garde(skip)]
    phone_number: Option<String>,
    #[garde(skip)]
    interests: Option<String>,
}

#[derive(new)]
pub struct UpdateUserProfileRequestWithUserId(UserId, UpdateUserProfileRequest);

impl From<UpdateUserProfileRequestWithUserId> for UpdateUserProfile {
    fn from(value: UpdateUserProfileRequestWithUserId) -> Self {
        let UpdateUserProfileRequestWithUserId(
            user_id,
            UpdateUserProfileRequest {
                user_name,
                address,
                pronouns,
                phone_number,
                interests,
            },
        ) = value;
        Self {
            user_id,
            user_name,
            address,
            pronouns,
            phone_number,
            interests,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleRequest {
    role: RoleName,
}

#[derive(new)]
pub struct UpdateUserRoleRequestWithUserId(UserId, UpdateUserRoleRequest);

impl From<UpdateUserRoleRequestWithUserId> for UpdateUserRole {
    fn from(value: UpdateUserRoleRequestWithUserId) -> Self {
        let UpdateUserRoleRequestWithUserId(user_id, UpdateUserRoleRequest { role }) = value;
        Self {
            user_id,
            role: Role::from(role),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBlockRequest {
    is_blocked: bool,
}

#[derive(new)]
pub struct UpdateUserBlockRequestWithUserId(UserId, UpdateUserBlockRequest);

impl From<UpdateUserBlockRequestWithUserId> for UpdateUserBlock {
    fn from(value: UpdateUserBlockRequestWithUserId) -> Self {
        let UpdateUserBlockRequestWithUserId(user_id, UpdateUserBlockRequest { is_blocked }) =
            value;
        Self {
            user_id,
            is_blocked,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub items: Vec<UserResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: RoleName,
    pub is_blocked: bool,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        let User {
            user_id,
            user_name,
            email,
            role,
            is_blocked,
        } = value;
        Self {
            user_id,
            user_name,
            email,
            role: RoleName::from(role),
            is_blocked,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: RoleName,
    pub is_blocked: bool,
    pub address: Option<String>,
    pub pronouns: Option<String>,
    pub phone_number: Option<String>,
    pub interests: Option<String>,
}

impl From<UserProfile> for UserProfileResponse {
    fn from(value: UserProfile) -> Self {
        let UserProfile {
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
        Self {
            user_id,
            user_name,
            email,
            role: RoleName::from(role),
            is_blocked,
            address,
            pronouns,
            phone_number,
            interests,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeesResponse {
    pub items: Vec<AttendeeResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<EventAttendee> for AttendeeResponse {
    fn from(value: EventAttendee) -> Self {
        let EventAttendee {
            user_id,
            user_name,
            email,
        } = value;
        Self {
            user_id,
            user_name,
            email,
        }
    }
}

/// 参加者への一斉連絡用。メールアドレスをカンマ区切りで返す
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeEmailsResponse {
    pub emails: String,
}

impl From<Vec<EventAttendee>> for AttendeeEmailsResponse {
    fn from(value: Vec<EventAttendee>) -> Self {
        let emails = value
            .into_iter()
            .map(|attendee| attendee.email)
            .collect::<Vec<_>>()
            .join(",");
        Self { emails }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendee_emails_are_comma_joined() {
        let attendees = vec![
            EventAttendee {
                user_id: UserId::new(),
                user_name: "Ada".into(),
                email: "ada@example.com".into(),
            },
            EventAttendee {
                user_id: UserId::new(),
                user_name: "Grace".into(),
                email: "grace@example.com".into(),
            },
        ];
        let res = AttendeeEmailsResponse::from(attendees);
        assert_eq!(res.emails, "ada@example.com,grace@example.com");
    }

    #[test]
    fn role_name_round_trips() {
        assert!(matches!(RoleName::from(Role::Admin), RoleName::Admin));
        assert_eq!(Role::from(RoleName::User), Role::User);
    }
}
