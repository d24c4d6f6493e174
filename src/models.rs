use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Schema (Mapped to Database) ---

/// Task
///
/// A to-do record from the `tasks` table. Columns are snake_case in the
/// store and camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Task {
    // Assigned by the store on insert, never changes.
    pub id: i32,
    pub username: String,
    pub email: String,
    pub text: String,
    pub is_completed: bool,
    // One-way marker: an admin changed `text` at least once.
    pub is_admin_edited: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewTask
///
/// A validated creation payload, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTask {
    pub username: String,
    pub email: String,
    pub text: String,
}

/// TaskChanges
///
/// The resolved change set of an admin update. `None` fields are left
/// untouched; `mark_admin_edited` can only ever raise the flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskChanges {
    pub text: Option<String>,
    pub is_completed: Option<bool>,
    pub mark_admin_edited: bool,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Fields are optional so that a missing field is reported as a validation
/// error rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[ts(optional)]
    pub username: Option<String>,
    #[ts(optional)]
    pub password: Option<String>,
}

/// CreateTaskRequest
///
/// Public creation payload (POST /api/tasks).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTaskRequest {
    #[schema(example = "alice")]
    #[ts(optional)]
    pub username: Option<String>,
    #[schema(example = "alice@example.com")]
    #[ts(optional)]
    pub email: Option<String>,
    #[schema(example = "Buy milk")]
    #[ts(optional)]
    pub text: Option<String>,
}

/// UpdateTaskRequest
///
/// Partial update payload (PUT /api/tasks/{id}). At least one field must be present.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_completed: Option<bool>,
}

// --- Response Envelopes (Output Schemas) ---

/// TaskPage
///
/// One page of the task listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TaskPage {
    pub items: Vec<Task>,
    // Unfiltered number of tasks in the store.
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TaskListResponse {
    pub success: bool,
    pub data: TaskPage,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateTaskResponse {
    pub success: bool,
    pub message: String,
    pub data: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateTaskResponse {
    pub success: bool,
    pub message: String,
    pub updated_task: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}
