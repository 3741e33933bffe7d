//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. JSON route handlers return `Result<T, AppError>`.
//! The Stripe webhook has its own response contract; see
//! [`crate::routes::webhook::WebhookError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout session creation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => match err {
                CheckoutError::Basket(_)
                | CheckoutError::Metadata(_)
                | CheckoutError::Price { .. } => StatusCode::BAD_REQUEST,
                CheckoutError::MissingBaseUrl => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Stripe(_) | CheckoutError::MissingSessionUrl => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Checkout(CheckoutError::Basket(err)) => err.to_string(),
            Self::Checkout(CheckoutError::Metadata(err)) => err.to_string(),
            Self::Checkout(CheckoutError::Price { product, .. }) => {
                format!("Invalid price for product {product}")
            }
            Self::Checkout(CheckoutError::Stripe(_) | CheckoutError::MissingSessionUrl) => {
                "Payment provider error".to_string()
            }
            Self::Checkout(CheckoutError::MissingBaseUrl) => "Internal server error".to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a storefront action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Creating checkout session", Some(&[("order_number", "ORD-1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use basketry_core::{BasketError, MetadataError, ProductId};

    use super::*;
    use crate::stripe::StripeError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(
            get_status(CheckoutError::Basket(BasketError::Empty).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                CheckoutError::Basket(BasketError::MissingPrice(ProductId::new("p"))).into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::Metadata(MetadataError::UntrimmedOrderNumber).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::MissingBaseUrl.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(
                CheckoutError::Stripe(StripeError::Api {
                    status: 401,
                    message: "Invalid API Key provided".to_string(),
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CheckoutError::MissingSessionUrl.into()),
            StatusCode::BAD_GATEWAY
        );
    }
}
