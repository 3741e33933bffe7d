//! Recording completed checkouts as order documents.
//!
//! Runs after the webhook signature has been verified. A completed session
//! is turned into exactly one `order` document; every other event type is
//! acknowledged without side effects.
//!
//! Deliveries are not deduplicated. Stripe retries a webhook until it gets
//! a 2xx, so a redelivered event produces a second order document.

use std::sync::Arc;

use basketry_core::{DocumentId, OrderMetadata, OrderStatus, minor_to_major};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::sanity::{ContentStore, ORDER_DOCUMENT_TYPE, OrderDocument, OrderLine, SanityError};
use crate::stripe::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSession, Event, LineItem, PaymentProvider, StripeError,
};

/// Errors that can occur when recording an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The session carries no metadata.
    #[error("Checkout session has no metadata")]
    MissingMetadata,

    /// The session metadata does not describe an order.
    #[error("Invalid order metadata: {0}")]
    InvalidMetadata(#[from] basketry_core::MetadataError),

    /// A line item has no catalog product id.
    #[error("Line item {0} has no product id")]
    MissingProductId(String),

    /// The event object is not a checkout session.
    #[error("Invalid checkout session payload: {0}")]
    InvalidSession(String),

    /// The order document could not be encoded.
    #[error("Failed to encode order document: {0}")]
    Encode(#[from] serde_json::Error),

    /// Fetching line items failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Writing the document failed.
    #[error("Sanity error: {0}")]
    Sanity(#[from] SanityError),
}

/// What happened to a verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// An order document was created.
    Recorded(DocumentId),
    /// The event type is not one the storefront acts on.
    Ignored,
}

/// Writes order documents for completed checkout sessions.
#[derive(Clone)]
pub struct OrderRecorder {
    payments: Arc<dyn PaymentProvider>,
    store: Arc<dyn ContentStore>,
}

impl OrderRecorder {
    #[must_use]
    pub fn new(payments: Arc<dyn PaymentProvider>, store: Arc<dyn ContentStore>) -> Self {
        Self { payments, store }
    }

    /// Act on a verified event.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidSession`] if a completed-session event
    /// does not contain a session, and any error from [`Self::record_order`].
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: &Event) -> Result<WebhookOutcome, OrderError> {
        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            debug!("Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
            .map_err(|e| OrderError::InvalidSession(e.to_string()))?;

        self.record_order(&session)
            .await
            .map(WebhookOutcome::Recorded)
    }

    /// Create the order document for a completed session.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is missing or invalid, a line item
    /// has no product id, or Stripe or Sanity fail. Nothing is written in
    /// any of these cases.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn record_order(&self, session: &CheckoutSession) -> Result<DocumentId, OrderError> {
        let result = self.try_record_order(session).await;
        if let Err(e) = &result {
            error!(error = %e, "Error creating order in Sanity");
        }
        result
    }

    async fn try_record_order(&self, session: &CheckoutSession) -> Result<DocumentId, OrderError> {
        let metadata = session
            .metadata
            .as_ref()
            .ok_or(OrderError::MissingMetadata)?;
        let metadata = OrderMetadata::from_map(metadata)?;

        let line_items = self.payments.list_line_items(&session.id).await?;
        let order_number = metadata.order_number.clone();
        let document = build_order_document(session, metadata, &line_items, Utc::now())?;

        let id = self.store.create(serde_json::to_value(&document)?).await?;

        info!(
            order_number = %order_number,
            document_id = %id,
            lines = document.products.len(),
            "Order recorded"
        );
        Ok(id)
    }
}

/// Build the order document for a session and its line items.
///
/// # Errors
///
/// Returns [`OrderError::MissingProductId`] if any line item lacks the
/// catalog product id; no partial document is produced.
pub fn build_order_document(
    session: &CheckoutSession,
    metadata: OrderMetadata,
    line_items: &[LineItem],
    order_date: DateTime<Utc>,
) -> Result<OrderDocument, OrderError> {
    let products = line_items
        .iter()
        .map(|item| {
            let product = item
                .catalog_product_id()
                .ok_or_else(|| OrderError::MissingProductId(item.id.clone()))?;
            Ok(OrderLine::new(product, item.quantity.unwrap_or(0)))
        })
        .collect::<Result<Vec<_>, OrderError>>()?;

    Ok(OrderDocument {
        document_type: ORDER_DOCUMENT_TYPE,
        order_number: metadata.order_number,
        stripe_checkout_session_id: session.id.clone(),
        stripe_payment_intent_id: session.payment_intent.clone(),
        customer_name: metadata.customer_name,
        stripe_customer_id: session.customer.clone(),
        user_id: metadata.user_id,
        email: metadata.customer_email,
        currency: session.currency.clone(),
        amount_discount: minor_to_major(session.amount_discount()),
        products,
        total_price: minor_to_major(session.amount_total.unwrap_or(0)),
        status: OrderStatus::Paid,
        order_date,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{FakePayments, FakeStore, line_item};

    fn session_json() -> Value {
        json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "amount_total": 4500,
            "currency": "gbp",
            "customer": "cus_1",
            "payment_intent": "pi_1",
            "metadata": {
                "orderNumber": "ORD-1",
                "customerName": "Ada",
                "customerEmail": "ada@example.com",
                "userId": "user_1"
            },
            "total_details": { "amount_discount": 500 }
        })
    }

    fn event(event_type: &str, object: Value) -> Event {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn recorder(payments: FakePayments, store: &Arc<FakeStore>) -> OrderRecorder {
        OrderRecorder::new(Arc::new(payments), store.clone())
    }

    #[tokio::test]
    async fn test_completed_session_creates_one_order() {
        let store = Arc::new(FakeStore::default());
        let payments = FakePayments::default()
            .with_line_items(vec![line_item("li_1", "prod-1", 2), line_item("li_2", "prod-2", 1)]);

        let outcome = recorder(payments, &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, session_json()))
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Recorded(_)));

        let created = store.created();
        assert_eq!(created.len(), 1);
        let order = &created[0];
        assert_eq!(order["_type"], "order");
        assert_eq!(order["orderNumber"], "ORD-1");
        assert_eq!(order["stripeCheckoutSessionId"], "cs_test_1");
        assert_eq!(order["stripePaymentIntentId"], "pi_1");
        assert_eq!(order["stripeCustomerId"], "cus_1");
        assert_eq!(order["email"], "ada@example.com");
        assert_eq!(order["userId"], "user_1");
        assert_eq!(order["currency"], "gbp");
        assert_eq!(order["totalPrice"], json!(45.0));
        assert_eq!(order["amountDiscount"], json!(5.0));
        assert_eq!(order["status"], "paid");
        assert_eq!(order["products"][0]["product"]["_ref"], "prod-1");
        assert_eq!(order["products"][0]["quantity"], 2);
        assert_eq!(order["products"][1]["product"]["_ref"], "prod-2");
        assert_ne!(order["products"][0]["_key"], order["products"][1]["_key"]);
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let store = Arc::new(FakeStore::default());
        let payments = FakePayments::default();

        let outcome = recorder(payments, &store)
            .handle_event(&event("payment_intent.succeeded", json!({ "id": "pi_1" })))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_writes_nothing() {
        let store = Arc::new(FakeStore::default());
        let mut session = session_json();
        session.as_object_mut().unwrap().remove("metadata");

        let err = recorder(FakePayments::default(), &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, session))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::MissingMetadata));
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_metadata_writes_nothing() {
        let store = Arc::new(FakeStore::default());
        let mut session = session_json();
        session["metadata"]["customerEmail"] = json!("not-an-email");

        let err = recorder(FakePayments::default(), &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, session))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidMetadata(_)));
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_line_item_without_product_id_fails_whole_order() {
        let store = Arc::new(FakeStore::default());
        let mut orphan = line_item("li_2", "prod-2", 1);
        orphan.price = None;
        let payments =
            FakePayments::default().with_line_items(vec![line_item("li_1", "prod-1", 1), orphan]);

        let err = recorder(payments, &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, session_json()))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::MissingProductId(ref id) if id == "li_2"));
        assert!(store.created().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_returned() {
        let store = Arc::new(FakeStore::failing());
        let payments = FakePayments::default().with_line_items(vec![line_item("li_1", "p", 1)]);

        let err = recorder(payments, &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, session_json()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Sanity(_)));
    }

    #[tokio::test]
    async fn test_non_session_object_is_invalid() {
        let store = Arc::new(FakeStore::default());
        let err = recorder(FakePayments::default(), &store)
            .handle_event(&event(CHECKOUT_SESSION_COMPLETED, json!({ "object": "charge" })))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidSession(_)));
    }

    #[test]
    fn test_build_order_document_defaults() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_2",
            "metadata": {}
        }))
        .unwrap();
        let metadata = OrderMetadata {
            order_number: "ORD-2".to_string(),
            customer_name: String::new(),
            customer_email: basketry_core::Email::parse("g@example.com").unwrap(),
            user_id: String::new(),
        };
        let mut item = line_item("li_1", "prod-1", 1);
        item.quantity = None;

        let document = build_order_document(&session, metadata, &[item], Utc::now()).unwrap();

        assert_eq!(document.total_price, Decimal::ZERO);
        assert_eq!(document.amount_discount, Decimal::ZERO);
        assert_eq!(document.products[0].quantity, 0);
        assert_eq!(document.status, OrderStatus::Paid);
        assert!(document.stripe_payment_intent_id.is_none());
    }
}
