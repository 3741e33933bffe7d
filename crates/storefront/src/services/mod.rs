//! Business logic services for storefront.
//!
//! # Services
//!
//! - `catalog` - Product listing by category (fail-soft)
//! - `checkout` - Basket validation and Stripe checkout session creation
//! - `orders` - Recording completed checkouts as Sanity order documents
//!
//! Services hold their providers behind the [`PaymentProvider`] and
//! [`ContentStore`] traits and are built once into `AppState`.
//!
//! [`PaymentProvider`]: crate::stripe::PaymentProvider
//! [`ContentStore`]: crate::sanity::ContentStore

pub mod catalog;
pub mod checkout;
pub mod orders;

pub use catalog::CatalogService;
pub use checkout::{CheckoutError, CheckoutService, CheckoutSettings};
pub use orders::{OrderError, OrderRecorder, WebhookOutcome};
