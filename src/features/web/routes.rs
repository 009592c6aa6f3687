use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::core::middleware::optional_auth_middleware;
use crate::features::courses::dtos::MAX_IMAGE_SIZE;
use crate::features::web::handlers;
use crate::features::web::state::WebState;

/// Server-rendered pages. Visitors are identified from the session cookie
/// when present; gated pages redirect anonymous visitors to `/login`.
pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(handlers::course_list))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/signup", get(handlers::signup_page).post(handlers::signup))
        // Courses
        .route("/courses", get(handlers::course_list))
        .route(
            "/courses/new",
            get(handlers::new_course_page).post(handlers::create_course),
        )
        .route("/courses/{id}", get(handlers::course_detail))
        .route(
            "/courses/{id}/edit",
            get(handlers::edit_course_page).post(handlers::update_course),
        )
        .route(
            "/courses/{id}/delete",
            get(handlers::delete_course_page).post(handlers::delete_course),
        )
        .route(
            "/courses/{id}/image",
            post(handlers::upload_cover).layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024)),
        )
        .route("/courses/{id}/image/delete", post(handlers::remove_cover))
        .route("/courses/{id}/enroll", post(handlers::enroll))
        // Categories
        .route("/categories", get(handlers::category_list))
        .route(
            "/categories/new",
            get(handlers::new_category_page).post(handlers::create_category),
        )
        .route("/categories/{id}", get(handlers::category_detail))
        .route(
            "/categories/{id}/edit",
            get(handlers::edit_category_page).post(handlers::update_category),
        )
        .route(
            "/categories/{id}/delete",
            get(handlers::delete_category_page).post(handlers::delete_category),
        )
        // Enrollments
        .route("/enrollments", get(handlers::enrollment_list))
        .route(
            "/enrollments/new",
            get(handlers::new_enrollment_page).post(handlers::create_enrollment),
        )
        .route("/enrollments/{id}", get(handlers::enrollment_detail))
        .route(
            "/enrollments/{id}/edit",
            get(handlers::edit_enrollment_page).post(handlers::update_enrollment),
        )
        .route(
            "/enrollments/{id}/delete",
            get(handlers::delete_enrollment_page).post(handlers::delete_enrollment),
        )
        .route("/enrollments/{id}/finish", post(handlers::finish_enrollment))
        .route(
            "/enrollments/{id}/cancel",
            get(handlers::cancel_enrollment_page).post(handlers::cancel_enrollment),
        )
        .route_layer(from_fn_with_state(
            state.auth.clone(),
            optional_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{staff_user, student_user, web_state, with_user};
    use crate::core::middleware::ACCESS_TOKEN_COOKIE;
    use axum::http::{header, StatusCode};
    use axum_extra::extract::cookie::Cookie;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use uuid::Uuid;

    fn server() -> TestServer {
        TestServer::new(routes(web_state())).unwrap()
    }

    #[tokio::test]
    async fn test_gated_page_redirects_to_login() {
        let response = server().get("/enrollments").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header(header::LOCATION),
            "/login?next=%2Fenrollments"
        );
    }

    #[tokio::test]
    async fn test_staff_pages_redirect_anonymous_visitors() {
        let response = server().get("/courses/new").await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_staff_pages_forbid_students() {
        let server = TestServer::new(with_user(routes(web_state()), student_user())).unwrap();

        let response = server.get("/categories/new").await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(response.text().contains("Only staff can modify the catalog"));

        let response = server
            .post("/courses/new")
            .form(&[("title", "Go Basics")])
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_students_cannot_replace_cover_images() {
        let server = TestServer::new(with_user(routes(web_state()), student_user())).unwrap();

        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(&b"GIF89a"[..]).file_name("cover.gif").mime_type("image/gif"),
        );
        let response = server
            .post(&format!("/courses/{}/image", Uuid::new_v4()))
            .multipart(form)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .post(&format!("/courses/{}/image/delete", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_login_page_renders_form() {
        let response = server().get("/login?next=/enrollments").await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("name=\"username\""));
        assert!(html.contains("name=\"password\""));
        assert!(html.contains("href=\"/signup\""));
        // `/` is entity-escaped inside attributes
        assert!(html.contains("enrollments\">"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = server()
            .post("/logout")
            .add_cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "stale.session.token"))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        let cookie = response.header(header::SET_COOKIE);
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("access_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn test_signup_page_renders_form() {
        let response = server().get("/signup").await;
        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("name=\"password1\""));
        assert!(html.contains("name=\"password2\""));
    }

    #[tokio::test]
    async fn test_signup_form_errors_are_rerendered() {
        let response = server()
            .post("/signup")
            .form(&[
                ("username", "maria"),
                ("email", "maria@school.test"),
                ("password1", "correct horse"),
                ("password2", "battery staple"),
            ])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let html = response.text();
        assert!(html.contains("do not match"));
        assert!(html.contains("value=\"maria\""));
        assert!(!html.contains("correct horse"));
    }

    #[tokio::test]
    async fn test_signed_in_user_skips_signup() {
        let server = TestServer::new(with_user(routes(web_state()), student_user())).unwrap();
        let response = server.get("/signup").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/");
    }

    #[tokio::test]
    async fn test_new_category_form_for_staff() {
        let server = TestServer::new(with_user(routes(web_state()), staff_user())).unwrap();
        let response = server.get("/categories/new").await;
        response.assert_status_ok();
        assert!(response.text().contains("New category"));
    }

    #[tokio::test]
    async fn test_invalid_category_form_is_rerendered() {
        let server = TestServer::new(with_user(routes(web_state()), staff_user())).unwrap();
        let response = server
            .post("/categories/new")
            .form(&[("name", "Casino 2"), ("description", "")])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let html = response.text();
        assert!(html.contains("must not contain digits"));
        assert!(html.contains("value=\"Casino 2\""));
    }
}
