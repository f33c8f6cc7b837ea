use crate::{execution::ExecutionState, response::ErrorEnvelope};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("failed to start query execution: {0:#}")]
    Submission(#[source] anyhow::Error),

    #[error("failed to check query status: {0:#}")]
    StatusCheck(#[source] anyhow::Error),

    #[error("query execution {state}: {reason}")]
    Execution {
        state: ExecutionState,
        reason: String,
    },

    #[error("query timed out: {0}")]
    Timeout(String),

    #[error("query cancelled by caller")]
    Cancelled,

    #[error("failed to fetch query results: {0:#}")]
    ResultFetch(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::Config(_)
            | ServiceError::Submission(_)
            | ServiceError::StatusCheck(_)
            | ServiceError::Execution { .. }
            | ServiceError::Timeout(_)
            | ServiceError::Cancelled
            | ServiceError::ResultFetch(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in logs to tell the failure kinds apart.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Config(_) => "config",
            ServiceError::Validation(_) => "validation",
            ServiceError::MethodNotAllowed(_) => "method_not_allowed",
            ServiceError::Submission(_) => "submission",
            ServiceError::StatusCheck(_) => "status_check",
            ServiceError::Execution { .. } => "execution",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Cancelled => "cancelled",
            ServiceError::ResultFetch(_) => "result_fetch",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Renders this error as a failure envelope with the given headline.
    pub fn into_response_with_message(self, message: impl Into<String>) -> Response {
        let status = self.status_code();

        if !self.is_client_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        }

        let body = ErrorEnvelope::new(message, self.to_string());
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServiceError::Validation(detail) => detail.clone(),
            ServiceError::MethodNotAllowed(_) => "only GET is supported".to_string(),
            _ => "request failed".to_string(),
        };
        self.into_response_with_message(message)
    }
}
