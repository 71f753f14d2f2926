//! Error response implementation.

use super::types::ApiError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, warn};

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<HashMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            error!(
                error = %self,
                code = self.error_code(),
                "Server error occurred"
            );
        } else if matches!(
            self,
            ApiError::Unauthorized | ApiError::InvalidCredentials | ApiError::Forbidden
        ) {
            warn!(
                error = %self,
                code = self.error_code(),
                "Auth error occurred"
            );
        }

        let status = self.status_code();
        let code = self.error_code();

        let (message, fields) = match &self {
            ApiError::ValidationError(field_errors) => (self.to_string(), Some(field_errors.clone())),
            ApiError::Internal(err) => {
                // Don't expose internal error details in production
                let message = if cfg!(debug_assertions) {
                    format!("{}: {}", self, err)
                } else {
                    "An internal error occurred".to_string()
                };
                (message, None)
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code,
                message,
                fields,
            },
        };

        (status, Json(body)).into_response()
    }
}
