use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::JwtValidator;
use crate::features::users::UserService;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        // Parse origins into HeaderValue
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            let mut response = Response::new(Body::from("Unauthorized"));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Swagger UI\""),
            );

            Err(response)
        })
    }
}

/// Name of the cookie holding the web session token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Token validation plus principal lookup, shared by both auth middlewares
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<JwtValidator>,
    pub users: Arc<UserService>,
}

impl AuthState {
    pub fn new(validator: Arc<JwtValidator>, users: Arc<UserService>) -> Self {
        Self { validator, users }
    }

    /// Validate a token and load the active user it names
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let claims = self.validator.validate_token(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::Unauthorized("Invalid token subject".to_string()))?;

        self.users
            .find_principal(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))
    }
}

fn bearer_token(req: &Request) -> Option<Result<&str, AppError>> {
    let auth_header = req.headers().get(header::AUTHORIZATION)?;
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()));
    Some(token)
}

fn cookie_token(req: &Request) -> Option<String> {
    let jar = CookieJar::from_headers(req.headers());
    let value = jar.get(ACCESS_TOKEN_COOKIE)?.value_trimmed().to_string();
    (!value.is_empty()).then_some(value)
}

/// Requires a valid bearer token (API routes)
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))??
        .to_string();

    let user = auth.authenticate(&token).await?;

    // Insert authenticated user into request extensions
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Resolves the user from a bearer token or the session cookie when present
/// (web pages). Missing or stale credentials leave the request anonymous.
pub async fn optional_auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(Ok(token)) => Some(token.to_string()),
        Some(Err(_)) => None,
        None => cookie_token(&req),
    };

    if let Some(token) = token {
        match auth.authenticate(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!("Ignoring web credentials: {}", e),
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(name: header::HeaderName, value: &str) -> Request {
        axum::http::Request::builder()
            .uri("/")
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = request_with(header::AUTHORIZATION, "Bearer abc.def");
        assert_eq!(bearer_token(&req).unwrap().unwrap(), "abc.def");

        let req = request_with(header::AUTHORIZATION, "Basic Zm9vOmJhcg==");
        assert!(bearer_token(&req).unwrap().is_err());

        let req = request_with(header::COOKIE, "a=b");
        assert!(bearer_token(&req).is_none());
    }

    #[test]
    fn test_cookie_token_extraction() {
        let req = request_with(header::COOKIE, "theme=dark; access_token=tok123; x=y");
        assert_eq!(cookie_token(&req).as_deref(), Some("tok123"));

        let req = request_with(header::COOKIE, "access_token=");
        assert_eq!(cookie_token(&req), None);

        let req = request_with(header::COOKIE, "other_access_token=nope");
        assert_eq!(cookie_token(&req), None);
    }

    #[test]
    fn test_cookie_token_accepts_quoted_value() {
        let req = request_with(header::COOKIE, "access_token=\"abc.def.ghi\"");
        assert_eq!(cookie_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_api_ignores_session_cookie() {
        use crate::shared::test_helpers::auth_state;
        use axum::{middleware::from_fn_with_state, routing::get, Router};
        use axum_extra::extract::cookie::Cookie;
        use axum_test::TestServer;

        let app = Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .route_layer(from_fn_with_state(auth_state(), auth_middleware));
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/ping")
            .add_cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "abc.def.ghi"))
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Missing authorization header");
    }
}
