//! Error types for the operations API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the same shape:
//!
//! ```json
//! {"error": "insufficient stock ...", "kind": "INSUFFICIENT_STOCK", "status": 422}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relief_core::ReliefError;

/// Errors that can occur in the operations API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A service rejected the request.
    #[error(transparent)]
    Relief(#[from] ReliefError),

    /// The `x-operator-id` header is missing or blank.
    #[error("missing operator reference: set the x-operator-id header")]
    MissingOperator,

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The request body or query string could not be decoded.
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Relief(err) => match err {
                ReliefError::Validation(_) => StatusCode::BAD_REQUEST,
                ReliefError::NotFound { .. } => StatusCode::NOT_FOUND,
                ReliefError::Conflict(_) | ReliefError::State(_) => StatusCode::CONFLICT,
                ReliefError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ReliefError::Registry(_) => StatusCode::BAD_GATEWAY,
                ReliefError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::MissingOperator | Self::InvalidUuid(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Machine-readable kind carried in the body.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Relief(err) => err.kind(),
            Self::MissingOperator => "MISSING_OPERATOR",
            Self::InvalidUuid(_) | Self::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if let Self::Relief(ReliefError::Storage(err)) = &self {
            tracing::error!(error = %err, "Storage failure while serving request");
            String::from("storage failure")
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let conflict = ApiError::from(ReliefError::Conflict(String::from("active event")));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.kind(), "CONFLICT");

        let stock = ApiError::from(ReliefError::InsufficientStock {
            item_id: relief_types::ItemId::new(),
            available: 1,
            requested: 2,
        });
        assert_eq!(stock.status(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(ApiError::MissingOperator.status(), StatusCode::BAD_REQUEST);
    }
}
