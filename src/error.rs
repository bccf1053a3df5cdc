use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ports::{ProcessorError, RepositoryError};
use crate::use_cases::UseCaseError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Processor(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            // A dangling reference inside the registry is a server fault.
            RepositoryError::NotFound(what) => {
                AppError::Internal(format!("missing registry row: {}", what))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<ProcessorError> for AppError {
    fn from(e: ProcessorError) -> Self {
        AppError::Processor(e.to_string())
    }
}

impl From<UseCaseError> for AppError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::Repository(other) => other.into(),
            UseCaseError::Processor(other) => other.into(),
            e @ UseCaseError::MissingPaymentIntent(_) => AppError::BadRequest(e.to_string()),
            e @ UseCaseError::UnexpectedChargeStatus(_) => AppError::Processor(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_error_status_code() {
        let error = AppError::BadRequest("Bad request".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_status_code() {
        let error = AppError::Internal("boom".to_string());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_processor_error_is_bad_gateway() {
        let error: AppError = ProcessorError::Transport("connection reset".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_repository_conflict_is_database_error() {
        let error: AppError = RepositoryError::Conflict("duplicate".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_registry_row_during_reconcile_is_internal() {
        let error: AppError =
            UseCaseError::Repository(RepositoryError::NotFound("property 1".to_string())).into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_payment_intent_is_bad_request() {
        let error: AppError = UseCaseError::MissingPaymentIntent("cs_1".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_request_error_response() {
        let error = AppError::BadRequest("Invalid event payload".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_processor_error_response() {
        let error = AppError::Processor("circuit open".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
