use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Database model for an action log entry (joined with the acting user's name)
#[derive(Debug, Clone, FromRow)]
pub struct ActionLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub action_time: DateTime<Utc>,
}

/// Entity types tracked by the action log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AuditEntity {
    Category,
    Course,
    Enrollment,
    Role,
    User,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Category => "Category",
            AuditEntity::Course => "Course",
            AuditEntity::Enrollment => "Enrollment",
            AuditEntity::Role => "Role",
            AuditEntity::User => "User",
        }
    }
}

/// Tracked mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    Enrolled,
    Finished,
    Canceled,
    MemberAdded,
    MemberRemoved,
    Registered,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::Deleted => "deleted",
            AuditAction::Enrolled => "enrolled",
            AuditAction::Finished => "finished",
            AuditAction::Canceled => "canceled",
            AuditAction::MemberAdded => "member added",
            AuditAction::MemberRemoved => "member removed",
            AuditAction::Registered => "registered",
        }
    }
}
