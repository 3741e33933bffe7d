//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use basketry_core::Product;

use crate::state::AppState;

/// List the products in a category.
///
/// Always 200; lookup failures are logged and yield an empty list.
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<Vec<Product>> {
    Json(state.catalog().products_by_category(&slug).await)
}
