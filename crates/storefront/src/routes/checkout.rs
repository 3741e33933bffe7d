//! Checkout route handler.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use basketry_core::{BasketItem, OrderMetadata, group_basket_items};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

/// Request body for `POST /api/checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Basket entries; repeated products are merged.
    pub items: Vec<BasketItem>,
    pub metadata: OrderMetadata,
}

/// Response body for `POST /api/checkout`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page to redirect the buyer to.
    pub url: String,
}

/// Create a checkout session for a basket.
///
/// # Errors
///
/// Returns 400 for malformed bodies and invalid baskets, 500 when no
/// redirect base URL is configured and 502 when Stripe fails.
pub async fn create_checkout(
    State(state): State<AppState>,
    body: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    add_breadcrumb(
        "checkout",
        "Creating checkout session",
        Some(&[("order_number", request.metadata.order_number.as_str())]),
    );

    let items = group_basket_items(request.items);
    let url = state
        .checkout()
        .create_checkout_session(&items, &request.metadata)
        .await?;

    Ok(Json(CheckoutResponse { url }))
}
