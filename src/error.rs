use axum::{
    Json,
    extract::{
        State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    config::{AppConfig, Env},
    repository::RepositoryError,
};

/// ApiError
///
/// The single error type returned by every handler and by the token guard.
/// Each variant maps to exactly one HTTP status; the `Display` text is the
/// human-readable `error` string sent to the client, except for the 5xx
/// variants which never leak their internals.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("{0}")]
    NotFound(String),

    /// Store failure. Logged server-side, surfaced as a generic 500.
    #[error("Server Error")]
    Repository(#[from] RepositoryError),

    #[error("Server Error")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::MissingToken | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Repository(_) | Self::TokenSigning(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal error chain for server-side failures, `None` for client errors.
    fn internal_detail(&self) -> Option<String> {
        match self {
            Self::Repository(e) => Some(format!("{:?}", e)),
            Self::TokenSigning(e) => Some(format!("{:?}", e)),
            _ => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// ErrorBody
///
/// The JSON envelope of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    /// Internal error chain. Only present in the development configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stack: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            stack: None,
        }
    }
}

/// Response extension carrying the internal detail of a 5xx error, picked up
/// by `expose_error_details` in development.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub stack: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match self.internal_detail() {
            Some(stack) => {
                tracing::error!(error = %stack, "request failed with a server error");
                let mut response = (status, Json(ErrorBody::new(message.clone()))).into_response();
                response
                    .extensions_mut()
                    .insert(ErrorDetail { message, stack });
                response
            }
            None => {
                if status == StatusCode::UNAUTHORIZED {
                    tracing::warn!("rejected request: {}", message);
                } else {
                    tracing::debug!("rejected request: {}", message);
                }
                (status, Json(ErrorBody::new(message))).into_response()
            }
        }
    }
}

/// expose_error_details
///
/// Response mapper applied to the whole router. In the local (development)
/// configuration it rewrites server-error bodies to include the internal
/// error chain under `stack`; in production the generic body is left as is.
pub async fn expose_error_details(State(config): State<AppConfig>, response: Response) -> Response {
    if config.env != Env::Local {
        return response;
    }
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (parts, _) = response.into_parts();
    let body = ErrorBody {
        success: false,
        error: detail.message,
        stack: Some(detail.stack),
    };
    let rebuilt = Json(body).into_response();
    Response::from_parts(parts, rebuilt.into_body())
}

/// Fallback for unknown routes.
pub async fn not_found_fallback() -> ApiError {
    ApiError::not_found("Not found")
}
