use crate::services::error::{BatchError, ErrorKind};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    /// Environment failure whose message is still safe to show
    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Auth => AppError::Forbidden(message),
            ErrorKind::Validation | ErrorKind::NoOutput => AppError::BadRequest(message),
            ErrorKind::Resource => AppError::Resource(message),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Resource(_) | AppError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Forbidden(msg) => msg,
            AppError::BadRequest(msg) => msg,
            AppError::PayloadTooLarge(msg) => msg,
            AppError::Resource(msg) => {
                tracing::error!("Resource error: {}", msg);
                msg
            }
            AppError::Anyhow(e) => {
                tracing::error!("Anyhow error: {:?}", e);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error::Slot;

    #[test]
    fn test_batch_error_status() {
        assert_eq!(
            AppError::from(BatchError::InvalidNonce).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(BatchError::MissingUpload {
                row: 1,
                slot: Slot::Portrait
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(BatchError::NoValidRows).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(BatchError::TemplateMissing).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unexpected_errors_hide_details() {
        let err = AppError::from(anyhow::anyhow!("secret path /etc/x"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, AppError::Anyhow(_)));
    }

    #[test]
    fn test_resource_message_is_kept() {
        match AppError::from(BatchError::TemplateEmpty) {
            AppError::Resource(msg) => assert_eq!(msg, "SIP template is empty."),
            other => panic!("unexpected {:?}", other),
        }
    }
}
