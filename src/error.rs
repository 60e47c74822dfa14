// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::{error, warn};
use thiserror::Error;

use crate::store::StoreError;

/// Every failure an operation can surface to the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: i64) -> Self {
        AppError::NotFound(format!("{} not found with id: {}", kind, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
            // Backend details stay in the log.
            return HttpResponse::build(status).body("Internal server error");
        }
        if let AppError::Store(StoreError::Duplicate(detail)) = self {
            warn!("Unique index rejected a write: {}", detail);
            return HttpResponse::build(status)
                .body("A record with the same unique value already exists");
        }
        HttpResponse::build(status).body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_kind_to_its_status() {
        assert_eq!(AppError::not_found("Task", 7).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("taken".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::validation("blank").status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Forbidden("no".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Store(StoreError::Duplicate("email".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Store(StoreError::Backend("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn duplicate_key_body_hides_backend_detail() {
        let err = AppError::Store(StoreError::Duplicate(
            "E11000 duplicate key error collection: taskline.labels index: name_1".into(),
        ));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("already exists"));
        assert!(!body.contains("E11000"));
    }

    #[test]
    fn not_found_message_names_kind_and_id() {
        assert_eq!(AppError::not_found("Label", 3).to_string(), "Label not found with id: 3");
    }
}
