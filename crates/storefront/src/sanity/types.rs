//! Documents written to Sanity.

use basketry_core::{
    CheckoutSessionId, CustomerId, Email, OrderStatus, PaymentIntentId, ProductId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Sanity `_type` of order documents.
pub const ORDER_DOCUMENT_TYPE: &str = "order";

/// An `order` document, created once per completed checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    #[serde(rename = "_type")]
    pub document_type: &'static str,
    pub order_number: String,
    pub stripe_checkout_session_id: CheckoutSessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_payment_intent_id: Option<PaymentIntentId>,
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<CustomerId>,
    pub user_id: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Discount in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_discount: Decimal,
    pub products: Vec<OrderLine>,
    /// Amount paid in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

/// One purchased product on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    /// Array item key, unique within the document.
    #[serde(rename = "_key")]
    pub key: String,
    pub product: Reference,
    pub quantity: u64,
}

impl OrderLine {
    /// A line referencing `product` with a fresh `_key`.
    #[must_use]
    pub fn new(product: ProductId, quantity: u64) -> Self {
        Self {
            key: Uuid::new_v4().to_string(),
            product: Reference::to(product),
            quantity,
        }
    }
}

/// A strong reference to another document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    #[serde(rename = "_type")]
    pub reference_type: &'static str,
    #[serde(rename = "_ref")]
    pub reference: ProductId,
}

impl Reference {
    #[must_use]
    pub const fn to(product: ProductId) -> Self {
        Self {
            reference_type: "reference",
            reference: product,
        }
    }
}
