use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Every handler error funnels through here. Rather than a hand-maintained
/// per-variant status table, the HTTP status is derived from the error
/// message by substring match — a new lower-level error type only needs a
/// message containing the right keyword to map correctly.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    CapTable(#[from] chainequity_captable::CapTableError),
    #[error(transparent)]
    Store(#[from] chainequity_store::StoreError),
    #[error("service not initialized")]
    ServiceNotInitialized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        let lower = message.to_lowercase();

        let status = if lower.contains("invalid") {
            StatusCode::BAD_REQUEST
        } else if lower.contains("not found") {
            StatusCode::NOT_FOUND
        } else if lower.contains("not approved") || lower.contains("unauthorized") {
            StatusCode::FORBIDDEN
        } else if lower.contains("service not initialized") || lower.contains("connection failed") {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %message, "unhandled api error");
        }

        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
            "statusCode": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn invalid_request_maps_to_400() {
        let response = ApiError::InvalidRequest("bad address".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = ApiError::NotFound("holder".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn service_not_initialized_maps_to_503() {
        let response = ApiError::ServiceNotInitialized.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unmatched_error_falls_back_to_500() {
        let err: ApiError = chainequity_store::StoreError::NotFound.into();
        // "record not found" contains "not found" and should map to 404, not 500.
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let body_err = ApiError::Store(chainequity_store::StoreError::Corrupt("x".into()));
        let response = body_err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 500);
        assert!(body["message"].as_str().unwrap().contains('x'));
    }

    #[tokio::test]
    async fn body_shape_carries_error_message_and_status_code() {
        let response = ApiError::InvalidRequest("bad address".into()).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["message"], "invalid request: bad address");
        assert_eq!(body["error"], "Bad Request");
    }
}
