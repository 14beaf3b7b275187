use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ItemsError;

/// `{id}` path segment parsed as an item id. Non-integers become 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub i64);

impl<S> FromRequestParts<S> for ItemId
where
    S: Send + Sync,
{
    type Rejection = ItemsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ItemsError::InvalidId(rejection.body_text()))?;
        raw.trim()
            .parse::<i64>()
            .map(ItemId)
            .map_err(|_| ItemsError::InvalidId(raw))
    }
}

/// JSON object request body. Every decoding failure (syntax, shape, content
/// type, non-object payload) is reported as 400 instead of axum's mix of
/// 400/415/422.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ItemsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ItemsError::InvalidBody(rejection.body_text()))?;

        // serde would otherwise accept `[7, "x", "y"]` for a struct
        if !value.is_object() {
            return Err(ItemsError::InvalidBody(
                "request body must be a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map(JsonBody)
            .map_err(|e| ItemsError::InvalidBody(e.to_string()))
    }
}
