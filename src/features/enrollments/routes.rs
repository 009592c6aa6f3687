use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::enrollments::handlers;
use crate::features::enrollments::services::EnrollmentService;

/// Enrollment routes (mounted behind authentication)
pub fn routes(service: Arc<EnrollmentService>) -> Router {
    Router::new()
        .route("/api/courses/{id}/enroll", post(handlers::enroll))
        .route("/api/courses/{id}/enrollments", get(handlers::get_course_roster))
        .route(
            "/api/enrollments",
            get(handlers::list_enrollments).post(handlers::create_enrollment),
        )
        .route(
            "/api/enrollments/{id}",
            get(handlers::get_enrollment)
                .put(handlers::update_enrollment)
                .patch(handlers::update_enrollment)
                .delete(handlers::delete_enrollment),
        )
        .route("/api/enrollments/{id}/finish", post(handlers::finish_enrollment))
        .route("/api/enrollments/{id}/cancel", post(handlers::cancel_enrollment))
        .with_state(service)
}
