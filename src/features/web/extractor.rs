//! Session guards for web pages.
//!
//! Unlike the API guards, an anonymous visitor is sent to the login page
//! instead of receiving a 401.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Method},
};

use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{Actor, Permission, Subject};
use crate::features::web::error::WebError;

/// Page to come back to after logging in. Form posts return to the home page.
fn return_path(parts: &Parts) -> String {
    if parts.method != Method::GET {
        return "/".to_string();
    }
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

fn signed_in(parts: &Parts) -> Result<AuthenticatedUser, WebError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| WebError::LoginRequired {
            next: return_path(parts),
        })
}

/// Any logged-in user
pub struct SignedIn(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        signed_in(parts).map(SignedIn)
    }
}

macro_rules! page_guard {
    ($(#[$doc:meta])* $name:ident => $permission:expr) => {
        $(#[$doc])*
        pub struct $name(pub AuthenticatedUser);

        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = WebError;

            async fn from_request_parts(
                parts: &mut Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                let user = signed_in(parts)?;
                Actor::from(user.clone()).authorize($permission, &Subject::NONE)?;
                Ok($name(user))
            }
        }
    };
}

page_guard!(
    /// Logged-in user allowed to edit categories and courses
    CatalogEditor => Permission::MutateCatalog
);

page_guard!(
    /// Logged-in user allowed to manage any enrollment
    EnrollmentAdmin => Permission::AdministerEnrollment
);
