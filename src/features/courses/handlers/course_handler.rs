use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::CatalogEditor;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::courses::dtos::{
    CourseHistoryDto, CourseImageForm, CourseImageUpload, CourseInputDto, CoursePatchDto,
    CourseQueryParams, CourseResponseDto,
};
use crate::features::courses::services::{CourseImageService, CourseScope, CourseService};
use crate::shared::types::{ApiResponse, Meta};

type CourseListResponse = Result<Json<ApiResponse<Vec<CourseResponseDto>>>>;

async fn list_scoped(
    service: &CourseService,
    scope: CourseScope,
    params: CourseQueryParams,
    user: &AuthenticatedUser,
) -> CourseListResponse {
    let (courses, total) = service.list(scope, &params, Some(user.user_id)).await?;
    Ok(Json(ApiResponse::success(
        Some(courses),
        None,
        Some(Meta::paginated(total, &params.pagination())),
    )))
}

/// List courses
#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseQueryParams),
    responses(
        (status = 200, description = "List of courses", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 400, description = "Invalid ordering"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_courses(
    user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Query(params): Query<CourseQueryParams>,
) -> CourseListResponse {
    list_scoped(&service, CourseScope::All, params, &user).await
}

/// Courses starting within the next seven days
#[utoipa::path(
    get,
    path = "/api/courses/upcoming",
    params(CourseQueryParams),
    responses(
        (status = 200, description = "Upcoming courses", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_upcoming_courses(
    user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Query(params): Query<CourseQueryParams>,
) -> CourseListResponse {
    list_scoped(&service, CourseScope::Upcoming, params, &user).await
}

/// Published courses priced 5000 or more, plus courses starting tomorrow
#[utoipa::path(
    get,
    path = "/api/courses/premium-or-tomorrow",
    params(CourseQueryParams),
    responses(
        (status = 200, description = "Premium or starting tomorrow", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_premium_or_tomorrow_courses(
    user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Query(params): Query<CourseQueryParams>,
) -> CourseListResponse {
    list_scoped(&service, CourseScope::PremiumOrTomorrow, params, &user).await
}

/// Published courses the caller does not teach
#[utoipa::path(
    get,
    path = "/api/courses/foreign-active",
    params(CourseQueryParams),
    responses(
        (status = 200, description = "Courses taught by others", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_foreign_active_courses(
    user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Query(params): Query<CourseQueryParams>,
) -> CourseListResponse {
    let scope = CourseScope::ForeignPublished(user.user_id);
    list_scoped(&service, scope, params, &user).await
}

/// Courses of one category
#[utoipa::path(
    get,
    path = "/api/courses/category/{category_id}",
    params(
        ("category_id" = Uuid, Path, description = "Category ID"),
        CourseQueryParams
    ),
    responses(
        (status = 200, description = "Courses of the category", body = ApiResponse<Vec<CourseResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_category_courses(
    user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Path(category_id): Path<Uuid>,
    Query(params): Query<CourseQueryParams>,
) -> CourseListResponse {
    list_scoped(&service, CourseScope::Category(category_id), params, &user).await
}

/// Get course by ID
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course found", body = ApiResponse<CourseResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_course(
    _user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let course = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(course), None, None)))
}

/// Create a course (staff only)
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CourseInputDto,
    responses(
        (status = 201, description = "Course created", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 409, description = "Title already used in this category")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_course(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseService>>,
    AppJson(dto): AppJson<CourseInputDto>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponseDto>>)> {
    let draft = dto.into_draft()?;
    let course = service.create(Some(user.user_id), draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(course),
            Some("Course created successfully".to_string()),
            None,
        )),
    ))
}

/// Replace a course (staff only)
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    request_body = CourseInputDto,
    responses(
        (status = 200, description = "Course updated", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Title already used in this category")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_course(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CourseInputDto>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let draft = dto.into_draft()?;
    let course = service.update(user.user_id, id, draft).await?;
    Ok(Json(ApiResponse::success(
        Some(course),
        Some("Course updated successfully".to_string()),
        None,
    )))
}

/// Partially update a course (staff only)
#[utoipa::path(
    patch,
    path = "/api/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    request_body = CoursePatchDto,
    responses(
        (status = 200, description = "Course updated", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Title already used in this category")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn patch_course(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CoursePatchDto>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let course = service.patch(user.user_id, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(course),
        Some("Course updated successfully".to_string()),
        None,
    )))
}

/// Delete a course and its enrollments (staff only)
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Course not found")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_course(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Course deleted successfully".to_string()),
        None,
    )))
}

/// Upload or replace the cover image (staff only)
#[utoipa::path(
    put,
    path = "/api/courses/{id}/image",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    request_body(
        content = CourseImageForm,
        content_type = "multipart/form-data",
        description = "Cover image in the `image` field",
    ),
    responses(
        (status = 200, description = "Cover image stored", body = ApiResponse<CourseResponseDto>),
        (status = 400, description = "Missing image or unsupported type"),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Course not found"),
        (status = 413, description = "Image too large")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_course_image(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseImageService>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let upload = CourseImageUpload::from_multipart(&mut multipart).await?;
    let course = service.upload(user.user_id, id, upload).await?;
    Ok(Json(ApiResponse::success(
        Some(course),
        Some("Course image uploaded successfully".to_string()),
        None,
    )))
}

/// Remove the cover image (staff only)
#[utoipa::path(
    delete,
    path = "/api/courses/{id}/image",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Cover image removed", body = ApiResponse<CourseResponseDto>),
        (status = 403, description = "Forbidden - staff only"),
        (status = 404, description = "Course not found")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_course_image(
    CatalogEditor(user): CatalogEditor,
    State(service): State<Arc<CourseImageService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CourseResponseDto>>> {
    let course = service.remove(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        Some(course),
        Some("Course image removed successfully".to_string()),
        None,
    )))
}

/// Change history of a course, newest first (at most 50 entries)
#[utoipa::path(
    get,
    path = "/api/courses/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course history", body = ApiResponse<Vec<CourseHistoryDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    ),
    tag = "courses",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_course_history(
    _user: AuthenticatedUser,
    State(service): State<Arc<CourseService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CourseHistoryDto>>>> {
    let history = service.history(id).await?;
    Ok(Json(ApiResponse::success(Some(history), None, None)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::json;
    use uuid::Uuid;

    use crate::features::courses::routes;
    use crate::shared::test_helpers::{
        course_image_service, course_service, staff_user, student_user, with_user,
    };

    fn course_body(title: &str) -> serde_json::Value {
        json!({
            "category_id": Uuid::new_v4(),
            "title": title,
            "price": 4000,
            "start_date": "2025-01-10",
            "end_date": "2025-03-10"
        })
    }

    #[tokio::test]
    async fn test_listing_requires_authentication() {
        let server = TestServer::new(routes::routes(course_service())).unwrap();

        let response = server.get("/api/courses").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_students_cannot_create_courses() {
        let app = with_user(routes::routes(course_service()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server.post("/api/courses").json(&course_body("Go Basics")).await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_students_cannot_patch_courses() {
        let app = with_user(routes::routes(course_service()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server
            .patch(&format!("/api/courses/{}", Uuid::new_v4()))
            .json(&json!({ "price": 1 }))
            .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_course_rejected_before_storage() {
        let app = with_user(routes::routes(course_service()), staff_user());
        let server = TestServer::new(app).unwrap();

        let mut body = course_body("Go Basics");
        body["start_date"] = json!("2025-04-01");
        body["price"] = json!(0);

        let response = server.post("/api/courses").json(&body).await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("end_date:")));
        assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("price:")));
    }

    #[tokio::test]
    async fn test_unknown_ordering_rejected() {
        let app = with_user(routes::routes(course_service()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/courses?ordering=title").await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    fn image_form(content_type: &str, bytes: &'static [u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "image",
            Part::bytes(bytes).file_name("cover").mime_type(content_type),
        )
    }

    #[tokio::test]
    async fn test_students_cannot_upload_course_images() {
        let app = with_user(routes::image_routes(course_image_service()), student_user());
        let server = TestServer::new(app).unwrap();

        let response = server
            .put(&format!("/api/courses/{}/image", Uuid::new_v4()))
            .multipart(image_form("image/png", b"\x89PNG"))
            .await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_non_image_upload_rejected_before_storage() {
        let app = with_user(routes::image_routes(course_image_service()), staff_user());
        let server = TestServer::new(app).unwrap();

        let response = server
            .put(&format!("/api/courses/{}/image", Uuid::new_v4()))
            .multipart(image_form("application/pdf", b"%PDF-1.7"))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        let errors = body["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e.as_str().unwrap().starts_with("image:")));
    }

    #[tokio::test]
    async fn test_upload_without_image_field_rejected() {
        let app = with_user(routes::image_routes(course_image_service()), staff_user());
        let server = TestServer::new(app).unwrap();

        let response = server
            .put(&format!("/api/courses/{}/image", Uuid::new_v4()))
            .multipart(MultipartForm::new().add_text("caption", "cover"))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }
}
