use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RoleManager;
use crate::features::users::dtos::{CreateRoleDto, RoleResponseDto};
use crate::features::users::services::RoleService;
use crate::shared::types::ApiResponse;

/// List roles with their members (staff only)
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Roles", body = ApiResponse<Vec<RoleResponseDto>>),
        (status = 403, description = "Forbidden - staff only")
    ),
    tag = "roles",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_roles(
    RoleManager(_user): RoleManager,
    State(service): State<Arc<RoleService>>,
) -> Result<Json<ApiResponse<Vec<RoleResponseDto>>>> {
    let roles = service.list().await?;
    Ok(Json(ApiResponse::success(Some(roles), None, None)))
}

/// Create a role (staff only)
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = ApiResponse<RoleResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 409, description = "Role already exists")
    ),
    tag = "roles",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_role(
    RoleManager(user): RoleManager,
    State(service): State<Arc<RoleService>>,
    AppJson(dto): AppJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<ApiResponse<RoleResponseDto>>)> {
    dto.validate()?;

    let role = service.create(user.user_id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(role), None, None)),
    ))
}

/// Add a user to a role (staff only)
#[utoipa::path(
    put,
    path = "/api/roles/{id}/users/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member added", body = ApiResponse<RoleResponseDto>),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Role or user not found")
    ),
    tag = "roles",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn add_role_member(
    RoleManager(user): RoleManager,
    State(service): State<Arc<RoleService>>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<RoleResponseDto>>> {
    let role = service.add_member(Some(user.user_id), id, user_id).await?;
    Ok(Json(ApiResponse::success(Some(role), None, None)))
}

/// Remove a user from a role (staff only)
#[utoipa::path(
    delete,
    path = "/api/roles/{id}/users/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = ApiResponse<RoleResponseDto>),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Membership not found")
    ),
    tag = "roles",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn remove_role_member(
    RoleManager(user): RoleManager,
    State(service): State<Arc<RoleService>>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<RoleResponseDto>>> {
    let role = service.remove_member(user.user_id, id, user_id).await?;
    Ok(Json(ApiResponse::success(Some(role), None, None)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::features::users::routes;
    use crate::shared::constants::ROLE_TEACHER;
    use crate::shared::test_helpers::{role_service, staff_user, student_user, user, with_user};

    #[tokio::test]
    async fn test_roles_require_authentication() {
        let server = TestServer::new(routes::routes(role_service())).unwrap();

        let response = server.get("/api/roles").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_management_is_staff_only() {
        let app = with_user(routes::routes(role_service()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/roles")
            .json(&json!({ "name": "Mentor" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let path = format!("/api/roles/{}/users/{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        let response = server.put(&path).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_role_rejects_blank_name() {
        let app = with_user(routes::routes(role_service()), staff_user());
        let server = TestServer::new(app).unwrap();

        let response = server.post("/api/roles").json(&json!({ "name": "" })).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_reports_teacher_role() {
        let app = with_user(routes::routes(role_service()), user(false, &[ROLE_TEACHER]));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/users/me").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["is_teacher"], true);
        assert_eq!(body["data"]["is_staff"], false);
        assert_eq!(body["data"]["roles"], json!([ROLE_TEACHER]));
    }
}
