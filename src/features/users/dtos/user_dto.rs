use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::models::{Role, User};

/// DTO for /api/users/me response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponseDto {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    /// Holds the Teacher role and may be assigned to courses
    pub is_teacher: bool,
    pub roles: Vec<String>,
}

impl From<AuthenticatedUser> for MeResponseDto {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            is_teacher: user.is_teacher(),
            id: user.user_id,
            username: user.username,
            is_staff: user.is_staff,
            roles: user.roles,
        }
    }
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: Uuid,
    pub username: String,
    /// Full name when set, otherwise the username
    pub display_name: String,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            display_name: user.display_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(min = 1, max = 50, message = "Role name must be 1-50 characters"))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponseDto {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<String>,
}

impl From<Role> for RoleResponseDto {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
            members: r.members,
        }
    }
}
