use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use easyapi_core::CoreError;

/// Helper to create a JSON error response with a standard `{ "error": message }` body.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        error_response(status, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            ApiError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::NoEligibleLane(_)
            | CoreError::MissingParameter(_)
            | CoreError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn error_parts(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn statuses_and_bodies() {
        let (status, body) = error_parts(ApiError::NotFound("task missing".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "task missing");

        let (status, _) = error_parts(ApiError::Forbidden("no".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = error_parts(ApiError::BadRequest("bad".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_parts(ApiError::Internal("broke".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn core_errors_map_to_http_statuses() {
        let err: ApiError = CoreError::NotFound("algorithm 'x'".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = CoreError::NoEligibleLane("cuda".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = CoreError::Cancelled.into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
