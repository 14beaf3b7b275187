use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::db::{Item, ItemChanges, NewItem};
use crate::error::ItemsError;
use crate::middleware::extract::{ItemId, JsonBody};
use crate::router::ItemsState;

/// GET /items -> every stored item, ordered by id.
pub async fn list_items(State(state): State<ItemsState>) -> Result<Json<Vec<Item>>, ItemsError> {
    let items = state.storage.list().await?;
    Ok(Json(items))
}

/// POST /items -> 201 with the stored item.
pub async fn create_item(
    State(state): State<ItemsState>,
    JsonBody(item): JsonBody<NewItem>,
) -> Result<(StatusCode, Json<Item>), ItemsError> {
    let created = state.storage.insert(item).await?;
    info!(id = created.id, "item created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /items/{id}
pub async fn get_item(
    State(state): State<ItemsState>,
    ItemId(id): ItemId,
) -> Result<Json<Item>, ItemsError> {
    Ok(Json(state.storage.get(id).await?))
}

/// PUT /items/{id} -> overwrites the fields present in the body.
pub async fn update_item(
    State(state): State<ItemsState>,
    ItemId(id): ItemId,
    JsonBody(changes): JsonBody<ItemChanges>,
) -> Result<Json<Item>, ItemsError> {
    let updated = state.storage.update(id, changes).await?;
    info!(id, "item updated");
    Ok(Json(updated))
}

/// DELETE /items/{id} -> 204 on success.
pub async fn delete_item(
    State(state): State<ItemsState>,
    ItemId(id): ItemId,
) -> Result<StatusCode, ItemsError> {
    state.storage.delete(id).await?;
    info!(id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}
