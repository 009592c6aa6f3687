use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::EnrollmentAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::Actor;
use crate::features::enrollments::dtos::{
    CreateEnrollmentDto, EnrollmentQueryParams, EnrollmentResponseDto, RosterEntryDto,
    UpdateEnrollmentDto,
};
use crate::features::enrollments::services::EnrollmentService;
use crate::shared::types::{ApiResponse, Meta};

/// Enroll the caller in a course
///
/// Idempotent: the first call creates an active enrollment (201), later calls
/// return the existing one unchanged (200).
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enroll",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 201, description = "Enrollment created", body = ApiResponse<EnrollmentResponseDto>),
        (status = 200, description = "Already enrolled", body = ApiResponse<EnrollmentResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn enroll(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Path(course_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<EnrollmentResponseDto>>)> {
    let (enrollment, created) = service.enroll(&user, course_id).await?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Enrolled successfully")
    } else {
        (StatusCode::OK, "Already enrolled")
    };
    Ok((
        status,
        Json(ApiResponse::success(
            Some(enrollment),
            Some(message.to_string()),
            None,
        )),
    ))
}

/// Course roster (staff or the course teacher)
#[utoipa::path(
    get,
    path = "/api/courses/{id}/enrollments",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Roster", body = ApiResponse<Vec<RosterEntryDto>>),
        (status = 403, description = "Forbidden - staff or course teacher only"),
        (status = 404, description = "Course not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_course_roster(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RosterEntryDto>>>> {
    let roster = service.roster(&Actor::from(user), course_id).await?;
    Ok(Json(ApiResponse::success(Some(roster), None, None)))
}

/// List enrollments visible to the caller
#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentQueryParams),
    responses(
        (status = 200, description = "List of enrollments", body = ApiResponse<Vec<EnrollmentResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_enrollments(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Query(params): Query<EnrollmentQueryParams>,
) -> Result<Json<ApiResponse<Vec<EnrollmentResponseDto>>>> {
    let (enrollments, total) = service.list(&user, &params).await?;
    Ok(Json(ApiResponse::success(
        Some(enrollments),
        None,
        Some(Meta::paginated(total, &params.pagination())),
    )))
}

/// Create an enrollment
///
/// Non-staff callers may only enroll themselves, and only as `active`.
/// A duplicate (user, course) pair is rejected with 409.
#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Enrollment created", body = ApiResponse<EnrollmentResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already enrolled")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_enrollment(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    AppJson(dto): AppJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<ApiResponse<EnrollmentResponseDto>>)> {
    let enrollment = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(enrollment),
            Some("Enrollment created successfully".to_string()),
            None,
        )),
    ))
}

/// Get enrollment by ID
#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 200, description = "Enrollment found", body = ApiResponse<EnrollmentResponseDto>),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_enrollment(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnrollmentResponseDto>>> {
    let enrollment = service.get(&Actor::from(user), id).await?;
    Ok(Json(ApiResponse::success(Some(enrollment), None, None)))
}

/// Change enrollment status (staff only)
#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    request_body = UpdateEnrollmentDto,
    responses(
        (status = 200, description = "Enrollment updated", body = ApiResponse<EnrollmentResponseDto>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_enrollment(
    EnrollmentAdmin(user): EnrollmentAdmin,
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateEnrollmentDto>,
) -> Result<Json<ApiResponse<EnrollmentResponseDto>>> {
    let enrollment = service
        .update_status(&Actor::from(user), id, dto.status)
        .await?;
    Ok(Json(ApiResponse::success(
        Some(enrollment),
        Some("Enrollment updated successfully".to_string()),
        None,
    )))
}

/// Delete an enrollment (staff only)
#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 200, description = "Enrollment deleted"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_enrollment(
    EnrollmentAdmin(user): EnrollmentAdmin,
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(&Actor::from(user), id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Enrollment deleted successfully".to_string()),
        None,
    )))
}

/// Mark an enrollment finished (staff or the enrolled student)
#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/finish",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 200, description = "Enrollment finished", body = ApiResponse<EnrollmentResponseDto>),
        (status = 400, description = "Canceled enrollment"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn finish_enrollment(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnrollmentResponseDto>>> {
    let enrollment = service.finish(&Actor::from(user), id).await?;
    Ok(Json(ApiResponse::success(Some(enrollment), None, None)))
}

/// Cancel (delete) an active enrollment (staff or the enrolled student)
#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Enrollment ID")
    ),
    responses(
        (status = 200, description = "Enrollment canceled"),
        (status = 400, description = "Enrollment is not active"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "enrollments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel_enrollment(
    user: AuthenticatedUser,
    State(service): State<Arc<EnrollmentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.cancel(&Actor::from(user), id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Enrollment canceled".to_string()),
        None,
    )))
}
