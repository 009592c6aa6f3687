use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::audit::handlers;
use crate::features::audit::services::AuditRecorder;

/// Action log routes (staff only)
pub fn routes(recorder: Arc<AuditRecorder>) -> Router {
    Router::new()
        .route("/api/action-logs", get(handlers::list_action_logs))
        .with_state(recorder)
}
