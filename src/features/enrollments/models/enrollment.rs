use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::auth::policy::Subject;

/// Enrollment status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "enrollment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Finished,
    Canceled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Finished => "finished",
            EnrollmentStatus::Canceled => "canceled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "Active",
            EnrollmentStatus::Finished => "Finished",
            EnrollmentStatus::Canceled => "Canceled",
        }
    }

    /// Whether a stored row may move from `self` to `next`.
    /// Staying put is always allowed; the only real move is active -> finished.
    pub fn can_become(self, next: EnrollmentStatus) -> bool {
        self == next || (self == EnrollmentStatus::Active && next == EnrollmentStatus::Finished)
    }

    /// Statuses an enrollment can be written with
    pub fn is_writable(self) -> bool {
        self != EnrollmentStatus::Canceled
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "finished" => Ok(EnrollmentStatus::Finished),
            "canceled" => Ok(EnrollmentStatus::Canceled),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Database model for enrollment, joined with user and course details
#[derive(Debug, Clone, FromRow)]
pub struct Enrollment {
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

impl Enrollment {
    /// Ownership facts for access decisions
    pub fn subject(&self) -> Subject {
        Subject::enrollment(self.user_id, self.course_teacher_id)
    }
}

/// One student on a course roster
#[derive(Debug, Clone, FromRow)]
pub struct RosterEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use EnrollmentStatus::*;

        assert!(Active.can_become(Finished));
        assert!(Active.can_become(Active));
        assert!(Finished.can_become(Finished));
        assert!(!Finished.can_become(Active));
        assert!(!Active.can_become(Canceled));
        assert!(!Canceled.can_become(Finished));
    }

    #[test]
    fn test_canceled_is_not_writable() {
        assert!(EnrollmentStatus::Active.is_writable());
        assert!(EnrollmentStatus::Finished.is_writable());
        assert!(!EnrollmentStatus::Canceled.is_writable());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Finished,
            EnrollmentStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>(), Ok(status));
        }
        assert!("pending".parse::<EnrollmentStatus>().is_err());
    }
}
