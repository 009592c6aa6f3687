//! Authorization guards for record-independent permissions.
//!
//! Each guard extracts the authenticated user and asks the access policy
//! whether they hold the guarded permission.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{Actor, Permission, Subject};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Authenticated user holding `permission`
pub fn authorize_parts(
    parts: &Parts,
    permission: Permission,
) -> Result<AuthenticatedUser, AppError> {
    let user = parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    Actor::from(user.clone()).authorize(permission, &Subject::NONE)?;
    Ok(user)
}

macro_rules! permission_guard {
    ($(#[$doc:meta])* $name:ident => $permission:expr) => {
        $(#[$doc])*
        pub struct $name(pub AuthenticatedUser);

        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                _state: &S,
            ) -> Result<Self, Self::Rejection> {
                authorize_parts(parts, $permission).map($name)
            }
        }
    };
}

permission_guard!(
    /// Create, update and delete categories and courses.
    ///
    /// # Example
    /// ```ignore
    /// pub async fn handler(CatalogEditor(user): CatalogEditor) { ... }
    /// ```
    CatalogEditor => Permission::MutateCatalog
);

permission_guard!(
    /// Enrollment administration (any student, any status)
    EnrollmentAdmin => Permission::AdministerEnrollment
);

permission_guard!(
    /// Role and membership management
    RoleManager => Permission::ManageRoles
);

permission_guard!(AuditReader => Permission::ReadAuditLog);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{staff_user, student_user};
    use axum::http::Request;

    fn parts(user: Option<AuthenticatedUser>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user);
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_guard_rejects_anonymous_with_unauthorized() {
        let result = CatalogEditor::from_request_parts(&mut parts(None), &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_guard_uses_policy_denial_message() {
        let result = RoleManager::from_request_parts(&mut parts(Some(student_user())), &()).await;
        match result {
            Err(AppError::Forbidden(message)) => assert_eq!(message, "Only staff can manage roles"),
            _ => panic!("expected a policy denial"),
        }
    }

    #[tokio::test]
    async fn test_guard_admits_staff() {
        let staff = staff_user();
        let AuditReader(user) = AuditReader::from_request_parts(&mut parts(Some(staff.clone())), &())
            .await
            .unwrap();
        assert_eq!(user.user_id, staff.user_id);
    }
}
