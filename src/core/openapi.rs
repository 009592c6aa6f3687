use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::audit::{dtos as audit_dtos, handlers as audit_handlers};
use crate::features::auth::{dto as auth_dto, handler as auth_handler};
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::courses::{
    dtos as courses_dtos, handlers as courses_handlers, models as courses_models,
};
use crate::features::enrollments::{
    dtos as enrollments_dtos, handlers as enrollments_handlers, models as enrollments_models,
};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth_handler::register,
        auth_handler::login,
        // Users & roles
        users_handlers::get_me,
        users_handlers::list_roles,
        users_handlers::create_role,
        users_handlers::add_role_member,
        users_handlers::remove_role_member,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        // Courses
        courses_handlers::list_courses,
        courses_handlers::list_upcoming_courses,
        courses_handlers::list_premium_or_tomorrow_courses,
        courses_handlers::list_foreign_active_courses,
        courses_handlers::list_category_courses,
        courses_handlers::get_course,
        courses_handlers::create_course,
        courses_handlers::update_course,
        courses_handlers::patch_course,
        courses_handlers::delete_course,
        courses_handlers::get_course_history,
        courses_handlers::upload_course_image,
        courses_handlers::delete_course_image,
        // Enrollments
        enrollments_handlers::enroll,
        enrollments_handlers::get_course_roster,
        enrollments_handlers::list_enrollments,
        enrollments_handlers::create_enrollment,
        enrollments_handlers::get_enrollment,
        enrollments_handlers::update_enrollment,
        enrollments_handlers::delete_enrollment,
        enrollments_handlers::finish_enrollment,
        enrollments_handlers::cancel_enrollment,
        // Action log
        audit_handlers::list_action_logs,
    ),
    components(
        schemas(
            Meta,
            // Auth
            auth_dto::RegisterRequestDto,
            auth_dto::LoginRequestDto,
            auth_dto::AuthResponseDto,
            users_dtos::UserResponseDto,
            ApiResponse<auth_dto::AuthResponseDto>,
            // Users & roles
            users_dtos::MeResponseDto,
            users_dtos::CreateRoleDto,
            users_dtos::RoleResponseDto,
            ApiResponse<users_dtos::MeResponseDto>,
            ApiResponse<users_dtos::RoleResponseDto>,
            ApiResponse<Vec<users_dtos::RoleResponseDto>>,
            // Categories
            categories_dtos::CategoryInputDto,
            categories_dtos::CategoryResponseDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            // Courses
            courses_models::CourseLevel,
            courses_dtos::CourseInputDto,
            courses_dtos::CoursePatchDto,
            courses_dtos::CourseResponseDto,
            courses_dtos::CourseHistoryDto,
            courses_dtos::CourseImageForm,
            ApiResponse<courses_dtos::CourseResponseDto>,
            ApiResponse<Vec<courses_dtos::CourseResponseDto>>,
            ApiResponse<Vec<courses_dtos::CourseHistoryDto>>,
            // Enrollments
            enrollments_models::EnrollmentStatus,
            enrollments_dtos::CreateEnrollmentDto,
            enrollments_dtos::UpdateEnrollmentDto,
            enrollments_dtos::EnrollmentResponseDto,
            enrollments_dtos::RosterEntryDto,
            ApiResponse<enrollments_dtos::EnrollmentResponseDto>,
            ApiResponse<Vec<enrollments_dtos::EnrollmentResponseDto>>,
            ApiResponse<Vec<enrollments_dtos::RosterEntryDto>>,
            // Action log
            audit_dtos::ActionLogResponseDto,
            ApiResponse<Vec<audit_dtos::ActionLogResponseDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Registration and password login"),
        (name = "users", description = "Current user"),
        (name = "roles", description = "Role membership (staff only)"),
        (name = "categories", description = "Course categories (reads are public)"),
        (name = "courses", description = "Course catalog"),
        (name = "enrollments", description = "Enrollment lifecycle"),
        (name = "action-logs", description = "Administrative action log (staff only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Online School API",
        version = "0.1.0",
        description = "Course catalog and enrollment administration",
    )
)]
pub struct ApiDoc;

/// Adds the bearer JWT security scheme to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/courses",
            "/api/courses/{id}/enroll",
            "/api/courses/{id}/history",
            "/api/enrollments/{id}/finish",
            "/api/categories/{id}",
            "/api/action-logs",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
