//! Stripe API resources and request parameters.
//!
//! Only the fields the storefront reads are modelled. Unknown fields are
//! ignored when deserializing.

use std::collections::HashMap;

use basketry_core::{
    CheckoutSessionId, CurrencyCode, CustomerId, Email, OrderMetadata, PaymentIntentId, ProductId,
};
use serde::Deserialize;

/// Event type emitted when a buyer completes a hosted checkout.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Product metadata key holding the catalog product id.
pub const PRODUCT_ID_METADATA_KEY: &str = "id";

// =============================================================================
// Resources
// =============================================================================

/// A paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A Stripe customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
}

/// A checkout session, as returned on creation or inside a webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    /// Hosted checkout URL; only present while the session is open.
    pub url: Option<String>,
    /// Total in minor units, after discounts.
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer: Option<CustomerId>,
    pub payment_intent: Option<PaymentIntentId>,
    pub metadata: Option<HashMap<String, String>>,
    pub total_details: Option<TotalDetails>,
}

impl CheckoutSession {
    /// Discount applied to the session in minor units (0 when absent).
    #[must_use]
    pub fn amount_discount(&self) -> i64 {
        self.total_details
            .as_ref()
            .and_then(|details| details.amount_discount)
            .unwrap_or(0)
    }
}

/// Breakdown of session totals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalDetails {
    pub amount_discount: Option<i64>,
}

/// A purchased line item of a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub quantity: Option<u64>,
    pub price: Option<LineItemPrice>,
}

impl LineItem {
    /// Catalog product id stored on the expanded Stripe product.
    ///
    /// Returns `None` if the product was not expanded or carries no id.
    #[must_use]
    pub fn catalog_product_id(&self) -> Option<ProductId> {
        match self.price.as_ref()?.product.as_ref()? {
            Expandable::Object(product) => product
                .metadata
                .get(PRODUCT_ID_METADATA_KEY)
                .filter(|id| !id.is_empty())
                .map(|id| ProductId::new(id.as_str())),
            Expandable::Id(_) => None,
        }
    }
}

/// Price attached to a line item.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemPrice {
    pub product: Option<Expandable<StripeProduct>>,
}

/// A field that is either an object id or, when expanded, the object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(T),
}

/// A Stripe product created inline from `price_data`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeProduct {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// Payload of a webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

// =============================================================================
// Request parameters
// =============================================================================

/// How the session is attached to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCustomer {
    /// Reuse a customer found by email.
    Existing(CustomerId),
    /// Let Stripe create a customer for this email on completion.
    CreateFor(Email),
}

/// One `price_data` line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub currency: CurrencyCode,
    /// Unit price in minor units.
    pub unit_amount: i64,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Parameters for creating a one-off payment checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSession {
    pub customer: SessionCustomer,
    pub metadata: OrderMetadata,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub allow_promotion_codes: bool,
}

impl CreateCheckoutSession {
    /// Encode as Stripe's bracketed form parameters.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
            (
                "allow_promotion_codes".into(),
                self.allow_promotion_codes.to_string(),
            ),
        ];

        match &self.customer {
            SessionCustomer::Existing(id) => form.push(("customer".into(), id.to_string())),
            SessionCustomer::CreateFor(email) => {
                form.push(("customer_creation".into(), "always".into()));
                form.push(("customer_email".into(), email.to_string()));
            }
        }

        for (key, value) in self.metadata.to_pairs() {
            form.push((format!("metadata[{key}]"), value.to_string()));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let price = format!("line_items[{i}][price_data]");
            form.push((format!("{price}[currency]"), item.currency.to_string()));
            form.push((format!("{price}[unit_amount]"), item.unit_amount.to_string()));
            form.push((format!("{price}[product_data][name]"), item.name.clone()));
            form.push((
                format!("{price}[product_data][description]"),
                item.description.clone(),
            ));
            form.push((
                format!("{price}[product_data][metadata][{PRODUCT_ID_METADATA_KEY}]"),
                item.product_id.to_string(),
            ));
            for (j, image) in item.images.iter().enumerate() {
                form.push((format!("{price}[product_data][images][{j}]"), image.clone()));
            }
            form.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
        }

        form
    }
}
