//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Checkout
//! POST /api/checkout                    - Create a Stripe checkout session
//!
//! # Catalog
//! GET  /api/categories/{slug}/products  - Products in a category
//!
//! # Stripe
//! POST /webhook                         - Stripe webhook (signature verified)
//! ```

pub mod catalog;
pub mod checkout;
pub mod webhook;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::create_checkout))
        .route(
            "/categories/{slug}/products",
            get(catalog::products_by_category),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook::stripe_webhook))
        .nest("/api", api_routes())
}

/// Build the application with tracing and request ids.
///
/// Sentry layers are added by the binary, which owns the Sentry client.
pub fn app(state: AppState) -> Router {
    routes()
        .with_state(state)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check Stripe or Sanity.
async fn health() -> &'static str {
    "ok"
}
