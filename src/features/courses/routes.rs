use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};

use crate::features::courses::dtos::MAX_IMAGE_SIZE;
use crate::features::courses::handlers;
use crate::features::courses::services::{CourseImageService, CourseService};

/// Course routes (mounted behind authentication)
pub fn routes(service: Arc<CourseService>) -> Router {
    Router::new()
        .route(
            "/api/courses",
            get(handlers::list_courses).post(handlers::create_course),
        )
        .route("/api/courses/upcoming", get(handlers::list_upcoming_courses))
        .route(
            "/api/courses/premium-or-tomorrow",
            get(handlers::list_premium_or_tomorrow_courses),
        )
        .route(
            "/api/courses/foreign-active",
            get(handlers::list_foreign_active_courses),
        )
        .route(
            "/api/courses/category/{category_id}",
            get(handlers::list_category_courses),
        )
        .route(
            "/api/courses/{id}",
            get(handlers::get_course)
                .put(handlers::update_course)
                .patch(handlers::patch_course)
                .delete(handlers::delete_course),
        )
        .route("/api/courses/{id}/history", get(handlers::get_course_history))
        .with_state(service)
}

/// Cover image routes (mounted behind authentication)
pub fn image_routes(service: Arc<CourseImageService>) -> Router {
    Router::new()
        .route(
            "/api/courses/{id}/image",
            // Room for the multipart framing around the largest accepted image
            put(handlers::upload_course_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024))
                .delete(handlers::delete_course_image),
        )
        .with_state(service)
}
