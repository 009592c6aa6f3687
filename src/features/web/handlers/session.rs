use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use minijinja::context;
use serde::Deserialize;

use crate::core::error::AppError;
use crate::core::middleware::ACCESS_TOKEN_COOKIE;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::web::error::WebError;
use crate::features::web::forms::{safe_next, LoginForm, SignupForm};
use crate::features::web::state::WebState;
use crate::features::web::templates::render;
use crate::shared::validation::FieldErrors;

use super::form_errors;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn login_form(next: &str, username: &str, error: Option<&str>) -> Result<Html<String>, WebError> {
    Ok(render(
        "login.html",
        context! { next => safe_next(next), username, error },
    )?)
}

fn signup_form(form: &SignupForm, errors: &FieldErrors) -> Result<Html<String>, WebError> {
    Ok(render("signup.html", context! { form, errors })?)
}

pub async fn login_page(
    user: Option<AuthenticatedUser>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, WebError> {
    if user.is_some() {
        return Ok(Redirect::to(safe_next(&query.next)).into_response());
    }
    Ok(login_form(&query.next, "", None)?.into_response())
}

/// Checks username and password and keeps the issued token in an HttpOnly
/// cookie for later page loads
pub async fn login(
    State(state): State<WebState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    match state.accounts.login(form.credentials()).await {
        Ok(auth) => {
            tracing::info!("Web login: user={}", auth.user.id);
            let jar = jar.add(session_cookie(auth.access_token, state.secure_cookies));
            Ok((jar, Redirect::to(safe_next(&form.next))).into_response())
        }
        Err(AppError::Unauthorized(message)) => {
            let page = login_form(&form.next, &form.username, Some(&message))?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}

pub async fn signup_page(user: Option<AuthenticatedUser>) -> Result<Response, WebError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(signup_form(&SignupForm::default(), &FieldErrors::new())?.into_response())
}

/// New accounts are sent to the login page
pub async fn signup(
    State(state): State<WebState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let registration = match form.into_registration() {
        Ok(dto) => dto,
        Err(errors) => {
            return Ok((StatusCode::BAD_REQUEST, signup_form(&form, &errors)?).into_response())
        }
    };

    match state.accounts.register(registration).await {
        Ok(auth) => {
            tracing::info!("Web sign-up: user={}", auth.user.id);
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => {
            let (status, errors) = form_errors(e)?;
            Ok((status, signup_form(&form, &errors)?).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string(), false);
        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));

        assert_eq!(session_cookie("tok".to_string(), true).secure(), Some(true));
    }
}
