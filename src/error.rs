use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum ItemsError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("invalid item id: {0}")]
    InvalidId(String),

    #[error("item {0} not found")]
    NotFound(i64),

    #[error("item {0} already exists")]
    Conflict(i64),

    #[error("database operation timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),
}

impl ItemsError {
    pub fn status(&self) -> StatusCode {
        match self {
            ItemsError::InvalidBody(_) | ItemsError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ItemsError::NotFound(_) => StatusCode::NOT_FOUND,
            ItemsError::Conflict(_) => StatusCode::CONFLICT,
            ItemsError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ItemsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ItemsError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            // Raw driver text stays in the logs, never in the response.
            error!(error = %self, "internal error while serving request");
        }
        let body = match self {
            ItemsError::InvalidBody(reason) => ApiErrorBody {
                code: "INVALID_BODY".to_string(),
                message: reason,
            },
            ItemsError::InvalidId(raw) => ApiErrorBody {
                code: "INVALID_ID".to_string(),
                message: format!("`{raw}` is not a valid item id."),
            },
            ItemsError::NotFound(id) => ApiErrorBody {
                code: "NOT_FOUND".to_string(),
                message: format!("Item {id} not found."),
            },
            ItemsError::Conflict(id) => ApiErrorBody {
                code: "CONFLICT".to_string(),
                message: format!("Item {id} already exists."),
            },
            ItemsError::Timeout => ApiErrorBody {
                code: "TIMEOUT".to_string(),
                message: "The database did not respond in time.".to_string(),
            },
            ItemsError::Database(_) => ApiErrorBody {
                code: "INTERNAL_ERROR".to_string(),
                message: "An internal server error occurred.".to_string(),
            },
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ItemsError) -> (StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, body) = body_of(ItemsError::NotFound(7)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains(r#""code":"NOT_FOUND""#));
        assert!(body.contains("Item 7 not found."));
    }

    #[tokio::test]
    async fn database_error_hides_driver_text() {
        let err = ItemsError::Database(SqlxError::Protocol("no such table: items".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains(r#""code":"INTERNAL_ERROR""#));
        assert!(!body.contains("no such table"));
    }

    #[test]
    fn client_errors_are_4xx() {
        assert_eq!(
            ItemsError::InvalidBody("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ItemsError::InvalidId("abc".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ItemsError::Conflict(1).status(), StatusCode::CONFLICT);
        assert_eq!(ItemsError::Timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn only_store_failures_are_500() {
        assert_eq!(
            ItemsError::Database(SqlxError::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ItemsError::NotFound(1).status(), StatusCode::NOT_FOUND);
    }
}
