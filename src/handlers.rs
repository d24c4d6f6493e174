use crate::{
    AppState,
    auth::{self, AdminSession},
    error::{ApiError, ErrorBody},
    models::{
        CreateTaskRequest, CreateTaskResponse, LoginRequest, LoginResponse, TaskListResponse,
        TaskPage, UpdateTaskRequest, UpdateTaskResponse,
    },
    tasks::{self, ListParams, TaskQuery},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};

// --- Handlers ---

/// root
///
/// [Public Route] Liveness banner.
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Task Manager API is running!" }))
}

/// login
///
/// [Public Route] Exchanges the admin credentials for a signed one-hour token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let config = &state.config;

    auth::check_credentials(
        config,
        payload.username.as_deref(),
        payload.password.as_deref(),
    )?;
    let token = auth::issue_token(config, &config.admin_username)?;
    tracing::info!("admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
    }))
}

/// list_tasks
///
/// [Public Route] One page of tasks. Unknown sort keys, directions and page
/// numbers fall back to their defaults instead of failing.
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(ListParams),
    responses(
        (status = 200, description = "One page of tasks", body = TaskListResponse),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let Query(params) = params?;
    let query = TaskQuery::from_params(&params);

    let items = state.repo.list_tasks(&query).await?;
    let total = state.repo.count_tasks().await?;

    Ok(Json(TaskListResponse {
        success: true,
        data: TaskPage {
            items,
            total,
            page: query.page,
            page_size: query.page_size(),
        },
    }))
}

/// create_task
///
/// [Public Route] Validates and stores a new task.
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Created", body = CreateTaskResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    let Json(payload) = payload?;
    let new_task = tasks::validate_new_task(payload)?;

    let task = state.repo.create_task(new_task).await?;
    tracing::info!(task_id = task.id, "task created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            success: true,
            message: "Task created successfully".to_string(),
            data: task,
        }),
    ))
}

/// update_task
///
/// [Admin Route] Changes a task's text and/or completion. The edited-by-admin
/// flag is raised when the submitted text differs from the stored one.
///
/// *Concurrency*: read-then-write without a version check. Two concurrent
/// edits are last-writer-wins and the text comparison uses the snapshot read.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated", body = UpdateTaskResponse),
        (status = 400, description = "Bad id or no fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn update_task(
    AdminSession(claims): AdminSession,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<UpdateTaskResponse>, ApiError> {
    let id = tasks::parse_task_id(&raw_id)?;
    let Json(payload) = payload?;
    tasks::ensure_has_changes(&payload)?;

    let current = state
        .repo
        .get_task(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found."))?;

    let changes = tasks::plan_update(&current, payload);
    let updated = state
        .repo
        .update_task(id, changes)
        .await?
        // The row vanished between the read and the write.
        .ok_or_else(|| ApiError::not_found("Task not found."))?;

    tracing::info!(
        task_id = updated.id,
        admin = %claims.username,
        admin_edited = updated.is_admin_edited,
        "task updated"
    );

    Ok(Json(UpdateTaskResponse {
        success: true,
        message: "Task updated successfully".to_string(),
        updated_task: updated,
    }))
}
