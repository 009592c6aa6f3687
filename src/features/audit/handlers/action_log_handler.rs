use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::core::error::Result;
use crate::features::audit::dtos::{ActionLogQueryParams, ActionLogResponseDto};
use crate::features::audit::services::AuditRecorder;
use crate::features::auth::guards::AuditReader;
use crate::shared::types::{ApiResponse, Meta};

/// List action log entries (staff only)
#[utoipa::path(
    get,
    path = "/api/action-logs",
    params(ActionLogQueryParams),
    responses(
        (status = 200, description = "Action log entries", body = ApiResponse<Vec<ActionLogResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - staff only")
    ),
    tag = "action-logs",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_action_logs(
    AuditReader(_user): AuditReader,
    State(recorder): State<Arc<AuditRecorder>>,
    Query(params): Query<ActionLogQueryParams>,
) -> Result<Json<ApiResponse<Vec<ActionLogResponseDto>>>> {
    let (logs, total) = recorder.list(&params).await?;
    Ok(Json(ApiResponse::success(
        Some(logs),
        None,
        Some(Meta::paginated(total, &params.pagination())),
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::features::audit::routes;
    use crate::shared::test_helpers::{audit, student_user, with_user};

    #[tokio::test]
    async fn test_action_log_requires_authentication() {
        let server = TestServer::new(routes::routes(audit())).unwrap();

        let response = server.get("/api/action-logs").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_action_log_is_staff_only() {
        let app = with_user(routes::routes(audit()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/action-logs").await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }
}
