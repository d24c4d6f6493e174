//! Listing and mutation rules for tasks: page/sort resolution, creation
//! validation and the admin-edit change set.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{CreateTaskRequest, NewTask, Task, TaskChanges, UpdateTaskRequest},
};

/// Fixed number of tasks per page.
pub const PAGE_SIZE: i64 = 3;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// ListParams
///
/// Raw query parameters of GET /api/tasks. Everything is kept as text so that
/// bad values fall back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number. Defaults to 1.
    pub page: Option<String>,
    /// One of `username`, `email`, `isCompleted`. Anything else sorts by creation time.
    pub sort_field: Option<String>,
    /// `asc` or `desc`. Anything else means `desc`.
    pub sort_dir: Option<String>,
}

/// SortField
///
/// Closed set of sortable keys. Client text is matched against this set and
/// only the enum's own column name ever reaches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Username,
    Email,
    IsCompleted,
}

impl SortField {
    /// Resolves a client-supplied key, falling back to `CreatedAt`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("username") => Self::Username,
            Some("email") => Self::Email,
            Some("isCompleted") => Self::IsCompleted,
            _ => Self::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Username => "username",
            Self::Email => "email",
            Self::IsCompleted => "is_completed",
        }
    }

    /// The key as the client spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Username => "username",
            Self::Email => "email",
            Self::IsCompleted => "isCompleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// TaskQuery
///
/// A fully resolved listing request. Construction never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQuery {
    pub page: i64,
    pub sort_field: SortField,
    pub sort_dir: SortDirection,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort_field: SortField::default(),
            sort_dir: SortDirection::default(),
        }
    }
}

impl TaskQuery {
    pub fn from_params(params: &ListParams) -> Self {
        let page = params
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        Self {
            page,
            sort_field: SortField::parse(params.sort_field.as_deref()),
            sort_dir: SortDirection::parse(params.sort_dir.as_deref()),
        }
    }

    pub fn page_size(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }
}

/// validate_new_task
///
/// Presence check on all three fields, then the email shape. Runs before any
/// persistence call.
pub fn validate_new_task(req: CreateTaskRequest) -> Result<NewTask, ApiError> {
    let (Some(username), Some(email), Some(text)) = (
        non_empty(req.username),
        non_empty(req.email),
        non_empty(req.text),
    ) else {
        return Err(ApiError::validation(
            "Username, email, and text are required.",
        ));
    };

    if !is_valid_email(&email) {
        return Err(ApiError::validation(
            "Please provide a valid email address.",
        ));
    }

    Ok(NewTask {
        username,
        email,
        text,
    })
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Parses the `{id}` path segment of an update.
pub fn parse_task_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::validation("Invalid task ID."))
}

/// Rejects an update body that carries neither `text` nor `isCompleted`.
pub fn ensure_has_changes(req: &UpdateTaskRequest) -> Result<(), ApiError> {
    if req.text.is_none() && req.is_completed.is_none() {
        return Err(ApiError::validation(
            "Text or isCompleted field is required for update.",
        ));
    }
    Ok(())
}

/// plan_update
///
/// Computes the change set of an admin update against the stored task. The
/// edited flag is raised only when the submitted text differs from the
/// current one; an unchanged text leaves it as it was.
pub fn plan_update(current: &Task, req: UpdateTaskRequest) -> TaskChanges {
    let mark_admin_edited = req
        .text
        .as_deref()
        .is_some_and(|text| text != current.text);

    TaskChanges {
        text: req.text,
        is_completed: req.is_completed,
        mark_admin_edited,
    }
}

/// Applies a change set to an in-memory task. The edited flag is monotonic.
pub fn apply_changes(task: &mut Task, changes: &TaskChanges) {
    if let Some(text) = &changes.text {
        task.text = text.clone();
    }
    if let Some(done) = changes.is_completed {
        task.is_completed = done;
    }
    task.is_admin_edited = task.is_admin_edited || changes.mark_admin_edited;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
