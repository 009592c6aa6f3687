//! Page templates using Jinja2 syntax.
//!
//! Sources are compiled into the binary and parsed once, on first render.

use std::sync::OnceLock;

use axum::response::Html;
use minijinja::{Environment, Value};
use thiserror::Error;

/// Global template environment
static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

macro_rules! web_template {
    ($name:literal) => {
        ($name, include_str!(concat!("../../../templates/web/", $name)))
    };
}

const TEMPLATES: &[(&str, &str)] = &[
    web_template!("_macros.html"),
    web_template!("base.html"),
    web_template!("error.html"),
    web_template!("login.html"),
    web_template!("signup.html"),
    web_template!("confirm_delete.html"),
    web_template!("course_list.html"),
    web_template!("course_detail.html"),
    web_template!("course_form.html"),
    web_template!("category_list.html"),
    web_template!("category_detail.html"),
    web_template!("category_form.html"),
    web_template!("enrollment_list.html"),
    web_template!("enrollment_detail.html"),
    web_template!("enrollment_form.html"),
];

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        } else {
            tracing::debug!("Loaded template: {}", name);
        }
    }
    env
}

fn environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a page. `.html` templates are auto-escaped.
pub fn render(name: &str, ctx: Value) -> Result<Html<String>, TemplateError> {
    let template = environment()
        .get_template(name)
        .map_err(|_| TemplateError::NotFound(name.to_string()))?;

    template
        .render(ctx)
        .map(Html)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}
