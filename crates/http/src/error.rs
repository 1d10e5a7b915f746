//! Error boundary for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use locallib_db::StoreError;
use serde_json::json;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Failures that escape a request handler.
///
/// Form validation and business-rule rejections are not errors at this level:
/// handlers render them as pages. Only missing records, malformed requests and
/// infrastructure failures end up here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String, code: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: "bad_request".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body shared by every failure response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let trace_id = Uuid::now_v7();
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    tracing::error!(
        trace_id = %trace_id,
        error_code = %code,
        status_code = %status.as_u16(),
        "Request error"
    );

    let body = json!({
        "error": {
            "code": code,
            "message": message,
            "details": [],
            "trace_id": trace_id.to_string(),
            "timestamp": timestamp
        }
    });

    (status, Json(body)).into_response()
}

/// Generic 500 response; never carries internal detail.
pub fn internal_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        INTERNAL_MESSAGE,
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::NotFound { message, code } | AppError::BadRequest { message, code } => {
                error_response(status, &code, &message)
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "document store failure");
                internal_error_response()
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "unhandled failure");
                internal_error_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_not_found_constructor() {
        match AppError::not_found("Author not found") {
            AppError::NotFound { code, message } => {
                assert_eq!(code, "not_found");
                assert_eq!(message, "Author not found");
            }
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_error_response_mapping() {
        let response = AppError::not_found("Resource not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::bad_request("bad form").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let error = AppError::Internal(anyhow::anyhow!("Database connection failed"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_store_error_maps_to_500() {
        let error = AppError::from(StoreError::Backend("socket closed".into()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("socket closed"));
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let body = body_json(AppError::not_found("Genre not found").into_response()).await;

        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Genre not found");
        assert!(body["error"]["details"].as_array().unwrap().is_empty());
        assert!(Uuid::parse_str(body["error"]["trace_id"].as_str().unwrap()).is_ok());
        assert!(OffsetDateTime::parse(body["error"]["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }
}
