use axum::{Router, middleware, routing::get};

use crate::db::ItemsStorage;
use crate::handlers::items::{create_item, delete_item, get_item, list_items, update_item};
use crate::middleware::logging::log_request;

/// Shared handler state; cheap to clone since the storage wraps a pool.
#[derive(Clone)]
pub struct ItemsState {
    pub storage: ItemsStorage,
}

impl ItemsState {
    pub fn new(storage: ItemsStorage) -> Self {
        Self { storage }
    }
}

pub fn items_router(state: ItemsState) -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
