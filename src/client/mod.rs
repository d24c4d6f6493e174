//! Client state layer: a typed HTTP client for the task API, an explicit
//! admin session with a cross-session invalidation channel, and the
//! page/sort/status state of the task list.

pub mod api;
pub mod board;
pub mod session;
pub mod state;

pub use api::{ClientError, TaskApiClient};
pub use board::TaskBoard;
pub use session::{Session, SessionEvent, SessionEventKind, SessionHub};
pub use state::{LoadStatus, TaskListState};
