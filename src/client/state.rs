use crate::{
    models::{Task, TaskPage},
    tasks::{PAGE_SIZE, SortDirection, SortField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// TaskListState
///
/// What the task list currently shows and how it is ordered. Failures only
/// record the error; the last good items stay in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListState {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub sort_field: SortField,
    pub sort_dir: SortDirection,
    pub status: LoadStatus,
    pub error: Option<String>,
}

impl Default for TaskListState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            page_size: PAGE_SIZE,
            sort_field: SortField::CreatedAt,
            sort_dir: SortDirection::Desc,
            status: LoadStatus::Idle,
            error: None,
        }
    }
}

impl TaskListState {
    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(1);
    }

    pub fn set_sort_field(&mut self, field: SortField) {
        self.sort_field = field;
    }

    pub fn set_sort_direction(&mut self, dir: SortDirection) {
        self.sort_dir = dir;
    }

    /// Drops the loaded data but keeps the sort order and the status.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total = 0;
        self.page = 1;
        self.error = None;
    }

    pub fn fetch_started(&mut self) {
        self.status = LoadStatus::Loading;
        self.error = None;
    }

    pub fn fetch_succeeded(&mut self, page: TaskPage) {
        self.status = LoadStatus::Succeeded;
        self.items = page.items;
        self.total = page.total;
        self.page = page.page;
        self.page_size = page.page_size;
    }

    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        self.status = LoadStatus::Failed;
        self.error = Some(message.into());
    }

    pub fn task_created(&mut self) {
        self.status = LoadStatus::Idle;
        self.error = None;
    }

    /// Replaces the task with the same id if it is on the current page.
    pub fn task_updated(&mut self, task: Task) {
        self.status = LoadStatus::Idle;
        self.error = None;
        if let Some(slot) = self.items.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }

    /// Records a failed create or update; items are left as they were.
    pub fn mutation_failed(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Whether `page` exists in the currently loaded listing.
    pub fn is_valid_page(&self, page: i64) -> bool {
        page >= 1 && page <= self.total_pages()
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }
}
