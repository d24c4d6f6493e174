use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use task_board::{
    AppState, InMemoryRepository, auth,
    config::{AppConfig, Env},
    create_router,
    models::{NewTask, Task, TaskChanges},
    repository::{Repository, RepositoryError},
    tasks::TaskQuery,
};
use tower::ServiceExt;

// --- FAILING REPOSITORY ---

// Every call fails as if the database were unreachable.
struct BrokenRepo;

fn broken() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl Repository for BrokenRepo {
    async fn list_tasks(&self, _query: &TaskQuery) -> Result<Vec<Task>, RepositoryError> {
        Err(broken())
    }
    async fn count_tasks(&self) -> Result<i64, RepositoryError> {
        Err(broken())
    }
    async fn create_task(&self, _task: NewTask) -> Result<Task, RepositoryError> {
        Err(broken())
    }
    async fn get_task(&self, _id: i32) -> Result<Option<Task>, RepositoryError> {
        Err(broken())
    }
    async fn update_task(
        &self,
        _id: i32,
        _changes: TaskChanges,
    ) -> Result<Option<Task>, RepositoryError> {
        Err(broken())
    }
}

// --- TEST UTILITIES ---

fn fixture(id: i32, username: &str, text: &str) -> Task {
    Task {
        id,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        text: text.to_string(),
        is_completed: false,
        is_admin_edited: false,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
            + Duration::minutes(id as i64),
    }
}

fn seeded_repo() -> Arc<InMemoryRepository> {
    Arc::new(InMemoryRepository::with_tasks(vec![
        fixture(1, "carol", "water plants"),
        fixture(2, "alice", "buy milk"),
        fixture(3, "bob", "call mom"),
        fixture(4, "dave", "pay rent"),
        fixture(5, "erin", "todo"),
    ]))
}

fn app_with(repo: Arc<dyn Repository>, config: AppConfig) -> Router {
    create_router(AppState { repo, config })
}

fn admin_token(config: &AppConfig) -> String {
    auth::issue_token(config, &config.admin_username).unwrap()
}

async fn call(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// --- LOGIN ---

#[tokio::test]
async fn test_login_success_returns_token() {
    let config = AppConfig::default();
    let app = app_with(seeded_repo(), config.clone());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap();
    let claims = auth::verify_token(&config, token).unwrap();
    assert_eq!(claims.sub, "admin");
    assert_eq!(claims.username, "admin");
}

#[tokio::test]
async fn test_login_missing_field_is_400() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Username and password are required.");
}

#[tokio::test]
async fn test_login_wrong_password_is_401() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

// --- LISTING ---

#[tokio::test]
async fn test_list_defaults_to_newest_first() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(app, Method::GET, "/api/tasks", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["total"], 5);
    assert_eq!(data["page"], 1);
    assert_eq!(data["pageSize"], 3);
    let ids: Vec<i64> = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 4, 3]);
}

#[tokio::test]
async fn test_list_second_page_sorted_by_username() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::GET,
        "/api/tasks?page=2&sort_field=username&sort_dir=asc",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["dave", "erin"]);
    assert_eq!(body["data"]["page"], 2);
}

#[tokio::test]
async fn test_list_bad_parameters_fall_back() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app.clone(),
        Method::GET,
        "/api/tasks?page=abc&sort_field=text;DROP%20TABLE%20tasks&sort_dir=sideways",
        None,
        None,
    )
    .await;
    let (_, defaults) = call(app, Method::GET, "/api/tasks", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, defaults);
}

#[tokio::test]
async fn test_list_store_failure_is_500() {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let app = app_with(Arc::new(BrokenRepo), config);

    let (status, body) = call(app, Method::GET, "/api/tasks", None, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Server Error");
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn test_store_failure_includes_stack_in_local() {
    let app = app_with(Arc::new(BrokenRepo), AppConfig::default());

    let (status, body) = call(app, Method::GET, "/api/tasks", None, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server Error");
    assert!(body["stack"].as_str().unwrap().contains("PoolTimedOut"));
}

// --- CREATION ---

#[tokio::test]
async fn test_create_task_returns_201_with_defaults() {
    let repo = seeded_repo();
    let app = app_with(repo.clone(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/tasks",
        None,
        Some(json!({ "username": "frank", "email": "frank@example.com", "text": "write tests" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 6);
    assert_eq!(body["data"]["isCompleted"], false);
    assert_eq!(body["data"]["isAdminEdited"], false);
    assert_eq!(repo.snapshot().await.len(), 6);
}

#[tokio::test]
async fn test_create_task_invalid_email_persists_nothing() {
    let repo = seeded_repo();
    let app = app_with(repo.clone(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/tasks",
        None,
        Some(json!({ "username": "frank", "email": "not-an-email", "text": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide a valid email address.");
    assert_eq!(repo.snapshot().await.len(), 5);
}

#[tokio::test]
async fn test_create_task_missing_text_is_400() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/tasks",
        None,
        Some(json!({ "username": "frank", "email": "frank@example.com", "text": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username, email, and text are required.");
}

#[tokio::test]
async fn test_create_task_malformed_json_is_400() {
    let app = app_with(seeded_repo(), AppConfig::default());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// --- UPDATE ---

#[tokio::test]
async fn test_update_changes_text_and_sets_flag() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let app = app_with(seeded_repo(), config);

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/5",
        Some(&token),
        Some(json!({ "text": "done" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["updatedTask"]["id"], 5);
    assert_eq!(body["updatedTask"]["text"], "done");
    assert_eq!(body["updatedTask"]["isAdminEdited"], true);
}

#[tokio::test]
async fn test_update_same_text_keeps_flag_clear() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let app = app_with(seeded_repo(), config);

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/5",
        Some(&token),
        Some(json!({ "text": "todo", "isCompleted": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updatedTask"]["isCompleted"], true);
    assert_eq!(body["updatedTask"]["isAdminEdited"], false);
}

#[tokio::test]
async fn test_update_flag_never_reverts() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let repo = seeded_repo();
    let app = app_with(repo.clone(), config);

    call(
        app.clone(),
        Method::PUT,
        "/api/tasks/2",
        Some(&token),
        Some(json!({ "text": "buy oat milk" })),
    )
    .await;
    call(
        app.clone(),
        Method::PUT,
        "/api/tasks/2",
        Some(&token),
        Some(json!({ "text": "buy milk" })),
    )
    .await;
    let (_, body) = call(
        app,
        Method::PUT,
        "/api/tasks/2",
        Some(&token),
        Some(json!({ "isCompleted": false })),
    )
    .await;

    assert_eq!(body["updatedTask"]["text"], "buy milk");
    assert_eq!(body["updatedTask"]["isAdminEdited"], true);
}

#[tokio::test]
async fn test_update_without_token_is_401_and_no_mutation() {
    let repo = seeded_repo();
    let app = app_with(repo.clone(), AppConfig::default());
    let before = repo.snapshot().await;

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/5",
        None,
        Some(json!({ "text": "hijacked" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access denied. No token provided.");
    assert_eq!(repo.snapshot().await, before);
}

#[tokio::test]
async fn test_update_with_forged_token_is_401() {
    let forged = AppConfig {
        jwt_secret: "some-other-secret".to_string(),
        ..AppConfig::default()
    };
    let token = admin_token(&forged);
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/5",
        Some(&token),
        Some(json!({ "text": "hijacked" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");
}

#[tokio::test]
async fn test_update_non_numeric_id_is_400() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let app = app_with(seeded_repo(), config);

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/abc",
        Some(&token),
        Some(json!({ "text": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid task ID.");
}

#[tokio::test]
async fn test_update_empty_body_is_400() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let app = app_with(seeded_repo(), config);

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/1",
        Some(&token),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text or isCompleted field is required for update.");
}

#[tokio::test]
async fn test_update_unknown_id_is_404() {
    let config = AppConfig::default();
    let token = admin_token(&config);
    let app = app_with(seeded_repo(), config);

    let (status, body) = call(
        app,
        Method::PUT,
        "/api/tasks/1005",
        Some(&token),
        Some(json!({ "text": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found.");
}

// --- MISC ROUTES ---

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = app_with(seeded_repo(), AppConfig::default());

    let (status, body) = call(app, Method::GET, "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_root_banner_and_request_id() {
    let app = app_with(seeded_repo(), AppConfig::default());
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
