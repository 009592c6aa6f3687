use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;

use crate::core::error::AppError;
use crate::features::web::templates::{render, TemplateError};

/// Failure of a web page, rendered as HTML rather than the JSON envelope
#[derive(Debug)]
pub enum WebError {
    /// Anonymous visitor on a login-gated page
    LoginRequired { next: String },
    App(AppError),
    Template(TemplateError),
}

impl From<AppError> for WebError {
    fn from(e: AppError) -> Self {
        WebError::App(e)
    }
}

impl From<TemplateError> for WebError {
    fn from(e: TemplateError) -> Self {
        WebError::Template(e)
    }
}

/// `/login` URL that returns to `next` afterwards
pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// Error page with the given status; falls back to plain text if the page
/// itself cannot be rendered
pub fn error_page(status: StatusCode, message: &str) -> Response {
    match render(
        "error.html",
        context! { status => status.as_u16(), message => message },
    ) {
        Ok(html) => (status, html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            (status, message.to_string()).into_response()
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            WebError::App(AppError::Unauthorized(_)) => Redirect::to("/login").into_response(),
            WebError::App(e) => {
                let message = match e.field_errors() {
                    Some(errors) => errors.to_string(),
                    None => e.public_message(),
                };
                error_page(e.status_code(), &message)
            }
            WebError::Template(e) => {
                tracing::error!("Template error: {}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
