use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::enrollments::models::{Enrollment, EnrollmentStatus, RosterEntry};
use crate::shared::types::{default_page, default_page_size, PaginationQuery};

/// Administrative create. Only staff may name another user.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEnrollmentDto {
    /// Defaults to the caller
    pub user_id: Option<Uuid>,
    pub course_id: Uuid,
    /// Defaults to `active`; `finished` requires staff
    #[serde(default)]
    pub status: EnrollmentStatus,
}

/// Administrative status change (staff only)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateEnrollmentDto {
    pub status: EnrollmentStatus,
}

/// Query params for listing enrollments
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct EnrollmentQueryParams {
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    pub status: Option<EnrollmentStatus>,
    pub course_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Enrolled on or after this date
    pub enrolled_after: Option<NaiveDate>,
    /// Enrolled on or before this date
    pub enrolled_before: Option<NaiveDate>,
    /// `1` restricts to the caller's own enrollments
    pub mine: Option<String>,
    /// `enrolled_at` or `-enrolled_at` (default)
    pub ordering: Option<String>,
}

impl Default for EnrollmentQueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            status: None,
            course_id: None,
            user_id: None,
            enrolled_after: None,
            enrolled_before: None,
            mine: None,
            ordering: None,
        }
    }
}

impl EnrollmentQueryParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.page_size)
    }

    pub fn mine(&self) -> bool {
        matches!(self.mine.as_deref(), Some("1") | Some("true"))
    }

    /// ORDER BY clause body; `None` for an unknown ordering
    pub fn order_sql(&self) -> Option<&'static str> {
        match self.ordering.as_deref().map(str::trim) {
            None | Some("") | Some("-enrolled_at") => Some("e.enrolled_at DESC, e.id"),
            Some("enrolled_at") => Some("e.enrolled_at ASC, e.id"),
            Some(_) => None,
        }
    }
}

/// Response DTO for enrollment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub category_name: String,
    pub course_teacher_id: Option<Uuid>,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponseDto {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            username: e.username,
            course_id: e.course_id,
            course_title: e.course_title,
            category_name: e.category_name,
            course_teacher_id: e.course_teacher_id,
            status: e.status,
            enrolled_at: e.enrolled_at,
        }
    }
}

/// Roster entry of a course
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntryDto {
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

impl From<RosterEntry> for RosterEntryDto {
    fn from(r: RosterEntry) -> Self {
        Self {
            enrollment_id: r.id,
            user_id: r.user_id,
            username: r.username,
            status: r.status,
            enrolled_at: r.enrolled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_defaults_to_active_and_caller() {
        let dto: CreateEnrollmentDto =
            serde_json::from_value(json!({ "course_id": Uuid::new_v4() })).unwrap();
        assert_eq!(dto.status, EnrollmentStatus::Active);
        assert!(dto.user_id.is_none());
    }

    #[test]
    fn test_order_sql() {
        let mut params = EnrollmentQueryParams::default();
        assert_eq!(params.order_sql(), Some("e.enrolled_at DESC, e.id"));
        params.ordering = Some("enrolled_at".to_string());
        assert_eq!(params.order_sql(), Some("e.enrolled_at ASC, e.id"));
        params.ordering = Some("status".to_string());
        assert_eq!(params.order_sql(), None);
    }
}
