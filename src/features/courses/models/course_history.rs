use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use super::CourseLevel;

/// Kind of change a history row records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryType {
    Created,
    Changed,
    Deleted,
}

impl HistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Created => "+",
            HistoryType::Changed => "~",
            HistoryType::Deleted => "-",
        }
    }
}

/// One snapshot of a course (joined with the author's username)
#[derive(Debug, Clone, FromRow)]
pub struct CourseHistory {
    pub history_id: i64,
    pub course_id: Uuid,
    pub revision: i32,
    pub history_type: String,
    pub history_date: DateTime<Utc>,
    pub history_user_id: Option<Uuid>,
    pub history_username: Option<String>,
    pub title: String,
    pub price: Decimal,
    pub level: CourseLevel,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_published: bool,
    pub image_url: Option<String>,
}
