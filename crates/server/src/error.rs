//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, RelayError>`. Server-side failures are
//! captured to Sentry before the response is built; every error renders as
//! `{"error": "<message>"}` JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

/// Request-level error taxonomy.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed envelope or missing required field.
    #[error("{0}")]
    BadRequest(String),

    /// Protected action called without a bearer credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Action name outside the closed enumeration.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Anything other than POST or OPTIONS.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Referenced order or invoice does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Record store, commerce API, or RPC failure.
    #[error("{0}")]
    Upstream(String),

    /// Unexpected failure inside the relay.
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Record store request failed");
        Self::Upstream("Record store request failed".to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Upstream(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `RelayError`.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_unknown_action_echoes_name() {
        let err = RelayError::UnknownAction("explode".to_string());
        assert_eq!(err.to_string(), "Unknown action: explode");
    }

    #[test]
    fn test_status_codes() {
        fn get_status(err: RelayError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(RelayError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RelayError::UnknownAction("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RelayError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(RelayError::MethodNotAllowed),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            get_status(RelayError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RelayError::Upstream("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(RelayError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_store_details_stay_out_of_the_body() {
        let err = RelayError::from(StoreError::Api {
            status: 409,
            message: "duplicate key value violates unique constraint \"invoices_number_key\""
                .to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Record store request failed" })
        );
    }

    #[tokio::test]
    async fn test_body_is_json_error() {
        let response = RelayError::NotFound("Order not found".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Order not found" }));
    }
}
