//! Stripe webhook handler.
//!
//! The body is taken as raw bytes: the signature covers the exact payload
//! Stripe sent, so it is verified before anything is parsed.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::services::{OrderError, WebhookOutcome};
use crate::state::AppState;
use crate::stripe::StripeError;
use crate::stripe::webhook::{SIGNATURE_HEADER, construct_event};

/// Webhook failures, each mapped to a fixed response.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header, or no signing secret configured.
    #[error("Unauthorized")]
    Unauthorized,

    /// The signature does not match the payload.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The order could not be recorded.
    #[error("Order creation failed: {0}")]
    OrderCreationFailed(OrderError),

    /// The payload verified but could not be processed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::BAD_REQUEST, "Unauthorized"),
            Self::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "Invalid signature"),
            Self::OrderCreationFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Order creation failed")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            error!(error = %self, sentry_event_id = %event_id, "Webhook error");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Handle a Stripe webhook delivery.
///
/// # Errors
///
/// Returns 400 for a missing or invalid signature and 500 when the event
/// cannot be processed or the order cannot be recorded.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        warn!("Webhook request without Stripe signature header");
        return Err(WebhookError::Unauthorized);
    };

    let stripe = &state.config().stripe;
    let Some(secret) = stripe.webhook_secret.as_ref() else {
        error!("STRIPE_WEBHOOK_SECRET is not configured");
        return Err(WebhookError::Unauthorized);
    };

    let event = construct_event(&body, signature, secret, stripe.webhook_tolerance()).map_err(
        |e| match e {
            StripeError::InvalidSignature(reason) => {
                warn!(%reason, "Webhook signature verification failed");
                WebhookError::InvalidSignature(reason)
            }
            other => WebhookError::Internal(other.to_string()),
        },
    )?;

    match state.orders().handle_event(&event).await {
        Ok(WebhookOutcome::Recorded(document_id)) => {
            info!(event_id = %event.id, %document_id, "Order created from webhook");
        }
        Ok(WebhookOutcome::Ignored) => {}
        Err(OrderError::InvalidSession(reason)) => return Err(WebhookError::Internal(reason)),
        Err(e) => return Err(WebhookError::OrderCreationFailed(e)),
    }

    Ok(Json(json!({ "received": true })))
}
