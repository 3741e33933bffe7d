//! Stripe REST API client and webhook verification.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the Stripe REST API (form-encoded
//!   requests, JSON responses); no SDK
//! - Stripe is the source of truth for customers and checkout sessions;
//!   nothing is cached or stored locally
//! - [`PaymentProvider`] is the seam the checkout and order services use,
//!   so tests can swap in an in-memory provider
//!
//! # Example
//!
//! ```rust,ignore
//! use basketry_storefront::stripe::{PaymentProvider, StripeClient};
//!
//! let stripe = StripeClient::new(&config.stripe)?;
//! let customer = stripe.find_customer_by_email(&email).await?;
//! ```

mod client;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use types::*;

use async_trait::async_trait;
use basketry_core::{CheckoutSessionId, Email};
use thiserror::Error;

/// Errors that can occur when interacting with Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response or payload could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook signature header missing parts or not matching the payload.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Operations the storefront needs from the payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Find the first customer registered with this email, if any.
    async fn find_customer_by_email(&self, email: &Email)
    -> Result<Option<Customer>, StripeError>;

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError>;

    /// List every line item of a session with prices and products expanded.
    async fn list_line_items(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError>;
}
