use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    error::ErrorBody,
    models::{
        CreateTaskRequest, CreateTaskResponse, LoginRequest, LoginResponse, Task,
        TaskListResponse, TaskPage, UpdateTaskRequest, UpdateTaskResponse,
    },
    tasks::{SortDirection, SortField},
};

/// ClientError
///
/// Every failure carries a human-readable message suitable for display.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with `{success: false, error}`.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// The request never produced a readable response.
    #[error("Network Error")]
    Network(#[source] reqwest::Error),

    #[error("Not logged in")]
    NotLoggedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// TaskApiClient
///
/// Thin typed wrapper over the JSON API. `base_url` is the server root,
/// e.g. `http://localhost:4000`.
#[derive(Clone, Debug)]
pub struct TaskApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl TaskApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let body = LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        let response: LoginResponse =
            send(self.http.post(self.url("/auth/login")).json(&body)).await?;
        Ok(response.token)
    }

    pub async fn list_tasks(
        &self,
        page: i64,
        sort_field: SortField,
        sort_dir: SortDirection,
    ) -> Result<TaskPage, ClientError> {
        let request = self.http.get(self.url("/tasks")).query(&[
            ("page", page.to_string()),
            ("sort_field", sort_field.as_str().to_string()),
            ("sort_dir", sort_dir.as_str().to_string()),
        ]);
        let response: TaskListResponse = send(request).await?;
        Ok(response.data)
    }

    pub async fn create_task(&self, task: &CreateTaskRequest) -> Result<Task, ClientError> {
        let response: CreateTaskResponse =
            send(self.http.post(self.url("/tasks")).json(task)).await?;
        Ok(response.data)
    }

    pub async fn update_task(
        &self,
        id: i32,
        changes: &UpdateTaskRequest,
        token: &str,
    ) -> Result<Task, ClientError> {
        let request = self
            .http
            .put(self.url(&format!("/tasks/{}", id)))
            .bearer_auth(token)
            .json(changes);
        let response: UpdateTaskResponse = send(request).await?;
        Ok(response.updated_task)
    }
}

/// Sends a request and decodes either the success envelope `T` or the
/// error envelope.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await.map_err(ClientError::Network)?;
    let status = response.status();

    if status.is_success() {
        return response.json::<T>().await.map_err(ClientError::Network);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => "Server Error".to_string(),
    };
    tracing::debug!(%status, %message, "api request failed");
    Err(ClientError::Api { status, message })
}
