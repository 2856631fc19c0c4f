//! Failures surfaced at the handler boundary and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::validation::ValidationError;

/// Shared by the unknown-email and wrong-password paths so neither can be told apart.
pub const CREDENTIALS_MESSAGE: &str = "Email & Password not found";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": err }))).into_response()
            }
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "failed", "message": CREDENTIALS_MESSAGE })),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "status": "failed" }))).into_response()
            }
            ApiError::Unexpected(err) => {
                error!(error = ?err, "request failed");
                (
                    StatusCode::OK,
                    Json(json!({ "status": "failed", "message": "Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unexpected_hides_details() {
        let res = ApiError::Unexpected(anyhow::anyhow!("connection refused on 10.0.0.3"))
            .into_response();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body, json!({ "status": "failed", "message": "Server Error" }));
    }

    #[tokio::test]
    async fn credentials_and_not_found_shapes() {
        let res = ApiError::InvalidCredentials.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["message"], CREDENTIALS_MESSAGE);

        let res = ApiError::NotFound.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await, json!({ "status": "failed" }));
    }
}
