use crate::{AppState, handlers};
use axum::{Router, routing::put};

/// Admin Router Module
///
/// Routes that mutate existing tasks. The whole router is wrapped in the
/// `require_admin` route layer by `create_router`, so a request without a
/// valid bearer token is rejected before path or body parsing.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // PUT /api/tasks/{id}
        // Edits text and/or completion; may raise the edited-by-admin flag.
        .route("/tasks/{id}", put(handlers::update_task))
}
