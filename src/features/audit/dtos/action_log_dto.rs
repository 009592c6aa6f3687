use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::audit::models::ActionLog;
use crate::shared::types::{default_page, default_page_size, PaginationQuery};

/// Query params for listing action log entries
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ActionLogQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Filter by acting user
    pub user_id: Option<Uuid>,
    /// Filter by entity type (e.g. "Course")
    pub entity: Option<String>,
    /// Filter by entity id
    pub entity_id: Option<Uuid>,
    /// Entries on or after this date (YYYY-MM-DD)
    pub from_date: Option<NaiveDate>,
    /// Entries on or before this date (YYYY-MM-DD)
    pub to_date: Option<NaiveDate>,
}

impl ActionLogQueryParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionLogResponseDto {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub action_time: DateTime<Utc>,
}

impl From<ActionLog> for ActionLogResponseDto {
    fn from(log: ActionLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            username: log.username,
            action: log.action,
            entity: log.entity,
            entity_id: log.entity_id,
            action_time: log.action_time,
        }
    }
}
