use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Server side: configuration, errors, auth, task rules, persistence, handlers.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod tasks;

// Routing segregated by access level (Public, Admin).
pub mod routes;
use routes::{admin, public};

// Client side: HTTP client, session and list state.
pub mod client;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the task API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::list_tasks, handlers::create_task, handlers::update_task
    ),
    components(
        schemas(
            models::Task, models::TaskPage, models::LoginRequest, models::LoginResponse,
            models::CreateTaskRequest, models::CreateTaskResponse, models::UpdateTaskRequest,
            models::UpdateTaskResponse, models::TaskListResponse, error::ErrorBody,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "task-board", description = "Task Board API")
    )
)]
struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the admin routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single, cloneable container of shared services and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, the token guard, the error-detail mapper and the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        // Admin Routes: every request must pass the token guard first.
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_admin,
            )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(handlers::root))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .fallback(error::not_found_fallback)
        .layer(middleware::map_response_with_state(
            state.config.clone(),
            error::expose_error_details,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Builds the CORS layer for the configured origin; `*` allows any origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin {
        "*" => AllowOrigin::any(),
        exact => match HeaderValue::from_str(exact) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("invalid CORS_ORIGIN '{}', allowing any origin", exact);
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(allow_origin)
        .allow_headers(Any)
}

/// trace_span_logger
///
/// Opens one span per request carrying the method, URI and `x-request-id`,
/// so every log line of a request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
