use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::features::users::handlers;
use crate::features::users::services::RoleService;

/// User and role routes (require authentication)
pub fn routes(role_service: Arc<RoleService>) -> Router {
    Router::new()
        .route("/api/users/me", get(handlers::get_me))
        .route(
            "/api/roles",
            get(handlers::list_roles).post(handlers::create_role),
        )
        .route(
            "/api/roles/{id}/users/{user_id}",
            put(handlers::add_role_member).delete(handlers::remove_role_member),
        )
        .with_state(role_service)
}
