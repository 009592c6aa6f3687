mod category_pages;
mod course_pages;
mod enrollment_pages;
mod session;

pub use category_pages::*;
pub use course_pages::*;
pub use enrollment_pages::*;
pub use session::*;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::features::web::error::WebError;
use crate::shared::types::{default_page, PaginationQuery};
use crate::shared::validation::FieldErrors;

/// `?page=` of a paginated page
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

/// Pager state handed to templates
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub number: i64,
    pub count: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl Page {
    pub fn new(pagination: &PaginationQuery, total: i64) -> Self {
        let count = pagination.page_count(total);
        let number = pagination.page.clamp(1, count);
        Self {
            number,
            count,
            has_previous: number > 1,
            has_next: number < count,
        }
    }
}

/// Validation and conflict failures go back onto the form; anything else
/// becomes an error page.
fn form_errors(e: AppError) -> Result<(StatusCode, FieldErrors), WebError> {
    match e.field_errors() {
        Some(errors) => Ok((e.status_code(), errors)),
        None => Err(e.into()),
    }
}
