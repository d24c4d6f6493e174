use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints open to any client. Mounted under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/login
        // Exchanges the admin credentials for a bearer token.
        .route("/auth/login", post(handlers::login))
        // GET /api/tasks?page=&sort_field=&sort_dir=
        // Paginated listing; bad parameters fall back to defaults.
        // POST /api/tasks
        // Anyone may submit a task.
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
}
