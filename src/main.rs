use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use task_board::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging and the database, then serves the API.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets or admin identity)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise sensible development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "task_board=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres = PostgresRepository::new(pool);
    postgres
        .ensure_schema()
        .await
        .expect("FATAL: Failed to provision the tasks table.");
    let repo = Arc::new(postgres) as RepositoryState;

    // 4. Router and server
    let port = config.port;
    let addr = format!("0.0.0.0:{}", port);
    let app = create_router(AppState { repo, config });

    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the listen address.");

    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
