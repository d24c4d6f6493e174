use crate::{
    models::{CreateTaskRequest, Task, UpdateTaskRequest},
    tasks::{SortDirection, SortField},
};

use super::{
    api::{ClientError, TaskApiClient},
    session::{Session, SessionHub},
    state::TaskListState,
};

/// TaskBoard
///
/// The client shell: owns the API client, this shell's session and the list
/// state, and keeps them consistent across calls. Every operation takes
/// `&mut self`, so a shell can never have two submits in flight.
#[derive(Debug)]
pub struct TaskBoard {
    api: TaskApiClient,
    session: Session,
    list: TaskListState,
}

impl TaskBoard {
    pub fn new(api: TaskApiClient, hub: &SessionHub) -> Self {
        Self {
            api,
            session: Session::new(hub),
            list: TaskListState::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn list(&self) -> &TaskListState {
        &self.list
    }

    /// Reloads the current page with the current sort order.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.list.fetch_started();
        let result = self
            .api
            .list_tasks(self.list.page, self.list.sort_field, self.list.sort_dir)
            .await;

        match result {
            Ok(page) => {
                self.list.fetch_succeeded(page);
                Ok(())
            }
            Err(e) => {
                self.list.fetch_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Moves to `page` and loads it. Pages outside `1..=total_pages()` of the
    /// loaded list are ignored, so nothing is fetched before the first load.
    pub async fn go_to_page(&mut self, page: i64) -> Result<(), ClientError> {
        if !self.list.is_valid_page(page) {
            tracing::debug!(page, total_pages = self.list.total_pages(), "page out of range");
            return Ok(());
        }
        self.list.set_page(page);
        self.refresh().await
    }

    /// Changes the order and reloads from the first page.
    pub async fn sort_by(
        &mut self,
        field: SortField,
        dir: SortDirection,
    ) -> Result<(), ClientError> {
        self.list.set_sort_field(field);
        self.list.set_sort_direction(dir);
        self.list.set_page(1);
        self.refresh().await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        self.session.login_started();
        match self.api.login(username, password).await {
            Ok(token) => {
                self.session.login_succeeded(token);
                Ok(())
            }
            Err(e) => {
                self.session.login_failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Creates a task, then reloads the current page so it shows up in order.
    pub async fn submit(&mut self, task: CreateTaskRequest) -> Result<Task, ClientError> {
        match self.api.create_task(&task).await {
            Ok(created) => {
                self.list.task_created();
                self.refresh().await?;
                Ok(created)
            }
            Err(e) => {
                self.list.mutation_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Edits a task with this shell's admin token.
    pub async fn edit(&mut self, id: i32, changes: UpdateTaskRequest) -> Result<Task, ClientError> {
        self.session.sync();
        let Some(token) = self.session.token().map(str::to_string) else {
            self.list.mutation_failed(ClientError::NotLoggedIn.to_string());
            return Err(ClientError::NotLoggedIn);
        };

        match self.api.update_task(id, &changes, &token).await {
            Ok(updated) => {
                self.list.task_updated(updated.clone());
                Ok(updated)
            }
            Err(e) => {
                self.list.mutation_failed(e.to_string());
                Err(e)
            }
        }
    }
}
