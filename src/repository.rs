use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, query_builder::QueryBuilder};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    models::{NewTask, Task, TaskChanges},
    tasks::{self, SortDirection, SortField, TaskQuery},
};

const TASK_COLUMNS: &str = "id, username, email, text, is_completed, is_admin_edited, created_at";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Abstract contract for all task persistence. Handlers only ever see
/// `Arc<dyn Repository>`, so the Postgres implementation and the in-memory
/// one used by tests are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    /// One page of tasks in the order described by `query`.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError>;
    /// Unfiltered number of tasks.
    async fn count_tasks(&self) -> Result<i64, RepositoryError>;
    async fn create_task(&self, task: NewTask) -> Result<Task, RepositoryError>;
    async fn get_task(&self, id: i32) -> Result<Option<Task>, RepositoryError>;
    /// Applies `changes` to the task. Returns `None` if the row does not exist.
    async fn update_task(
        &self,
        id: i32,
        changes: TaskChanges,
    ) -> Result<Option<Task>, RepositoryError>;
}

pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation, backed by a `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `tasks` table if it is missing. Called once at startup.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id SERIAL PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                text TEXT NOT NULL,
                is_completed BOOLEAN NOT NULL DEFAULT FALSE,
                is_admin_edited BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_tasks
    ///
    /// The ORDER BY clause is assembled only from `SortField::column` and
    /// `SortDirection::keyword`; paging values are bound parameters.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));

        let dir = query.sort_dir.keyword();
        builder.push(format!(
            " ORDER BY {} {dir}, id {dir}",
            query.sort_field.column()
        ));
        builder.push(" LIMIT ");
        builder.push_bind(query.page_size());
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("list_tasks error: {:?}", e))?;
        Ok(tasks)
    }

    async fn count_tasks(&self) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("count_tasks error: {:?}", e))?;
        Ok(total)
    }

    /// create_task
    ///
    /// New tasks start with `is_completed = false` and `is_admin_edited = false`;
    /// `id` and `created_at` come from the store.
    async fn create_task(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let created = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (username, email, text) VALUES ($1, $2, $3) RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.username)
        .bind(task.email)
        .bind(task.text)
        .fetch_one(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("create_task error: {:?}", e))?;
        Ok(created)
    }

    async fn get_task(&self, id: i32) -> Result<Option<Task>, RepositoryError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("get_task error: {:?}", e))?;
        Ok(task)
    }

    /// update_task
    ///
    /// Uses `COALESCE` so absent fields keep their stored value. The edited
    /// flag is OR-ed in and can never be cleared by this statement.
    async fn update_task(
        &self,
        id: i32,
        changes: TaskChanges,
    ) -> Result<Option<Task>, RepositoryError> {
        let updated = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET text = COALESCE($2, text),
                is_completed = COALESCE($3, is_completed),
                is_admin_edited = is_admin_edited OR $4
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.text)
        .bind(changes.is_completed)
        .bind(changes.mark_admin_edited)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("update_task error: {:?}", e))?;
        Ok(updated)
    }
}

/// InMemoryRepository
///
/// A `Repository` kept in process memory. Ordering and paging follow the
/// same rules as the Postgres queries, so handler and client tests can run
/// without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing rows, e.g. fixtures with fixed timestamps.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }
}

fn compare_by(field: SortField, a: &Task, b: &Task) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Username => a.username.cmp(&b.username),
        SortField::Email => a.email.cmp(&b.email),
        SortField::IsCompleted => a.is_completed.cmp(&b.is_completed),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError> {
        let mut tasks = self.tasks.read().await.clone();
        tasks.sort_by(|a, b| {
            let ordering = compare_by(query.sort_field, a, b);
            match query.sort_dir {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page_size()).unwrap_or(0);
        Ok(tasks.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_tasks(&self) -> Result<i64, RepositoryError> {
        Ok(self.tasks.read().await.len() as i64)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let mut tasks = self.tasks.write().await;
        let id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let created = Task {
            id,
            username: task.username,
            email: task.email,
            text: task.text,
            is_completed: false,
            is_admin_edited: false,
            created_at: Utc::now(),
        };
        tasks.push(created.clone());
        Ok(created)
    }

    async fn get_task(&self, id: i32) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn update_task(
        &self,
        id: i32,
        changes: TaskChanges,
    ) -> Result<Option<Task>, RepositoryError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            tasks::apply_changes(task, &changes);
            task.clone()
        }))
    }
}
