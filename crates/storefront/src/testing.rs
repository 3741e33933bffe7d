//! In-memory providers for tests.
//!
//! Compiled for unit tests and behind the `testing` feature, which the
//! integration test crate enables.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use basketry_core::{CheckoutSessionId, CustomerId, DocumentId, Email};
use serde_json::{Value, json};

use crate::sanity::{ContentStore, SanityError};
use crate::stripe::{
    CheckoutSession, CreateCheckoutSession, Customer, Expandable, LineItem, LineItemPrice,
    PRODUCT_ID_METADATA_KEY, PaymentProvider, StripeError, StripeProduct,
};

/// A line item whose expanded product carries `product_id` in its metadata.
#[must_use]
pub fn line_item(id: &str, product_id: &str, quantity: u64) -> LineItem {
    LineItem {
        id: id.to_string(),
        quantity: Some(quantity),
        price: Some(LineItemPrice {
            product: Some(Expandable::Object(StripeProduct {
                id: format!("prod_{id}"),
                metadata: [(PRODUCT_ID_METADATA_KEY.to_string(), product_id.to_string())]
                    .into_iter()
                    .collect(),
            })),
        }),
    }
}

/// Payment provider answering from canned data.
#[derive(Debug)]
pub struct FakePayments {
    customer: Option<CustomerId>,
    session_url: Option<String>,
    line_items: Vec<LineItem>,
    fail: bool,
    calls: AtomicUsize,
    last_session: Mutex<Option<CreateCheckoutSession>>,
}

impl Default for FakePayments {
    fn default() -> Self {
        Self {
            customer: None,
            session_url: Some(Self::SESSION_URL.to_string()),
            line_items: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_session: Mutex::new(None),
        }
    }
}

impl FakePayments {
    /// URL returned for every created session.
    pub const SESSION_URL: &'static str = "https://checkout.stripe.com/c/pay/cs_test_fake";

    /// Report `id` as the customer for any email.
    #[must_use]
    pub fn with_customer(mut self, id: &str) -> Self {
        self.customer = Some(CustomerId::new(id));
        self
    }

    /// Line items returned for any session.
    #[must_use]
    pub fn with_line_items(mut self, items: Vec<LineItem>) -> Self {
        self.line_items = items;
        self
    }

    /// Create sessions without a hosted URL.
    #[must_use]
    pub fn without_session_url(mut self) -> Self {
        self.session_url = None;
        self
    }

    /// Fail every call with an API error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of calls made to the provider.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Parameters of the most recently created session.
    pub fn last_session_params(&self) -> Option<CreateCheckoutSession> {
        self.last_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_call(&self) -> Result<(), StripeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StripeError::Api {
                status: 500,
                message: "api_error: Stripe is unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn find_customer_by_email(
        &self,
        _email: &Email,
    ) -> Result<Option<Customer>, StripeError> {
        self.record_call()?;
        Ok(self.customer.clone().map(|id| Customer { id }))
    }

    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        self.record_call()?;
        *self
            .last_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(params.clone());

        serde_json::from_value(json!({
            "id": "cs_test_fake",
            "url": self.session_url,
        }))
        .map_err(|e| StripeError::Parse(e.to_string()))
    }

    async fn list_line_items(
        &self,
        _session_id: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError> {
        self.record_call()?;
        Ok(self.line_items.clone())
    }
}

/// Content store keeping created documents in memory.
#[derive(Debug, Default)]
pub struct FakeStore {
    query_result: Value,
    fail: bool,
    queries: Mutex<Vec<(String, Vec<(String, Value)>)>>,
    created: Mutex<Vec<Value>>,
}

impl FakeStore {
    /// Answer every query with `result`.
    #[must_use]
    pub fn with_query_result(result: Value) -> Self {
        Self {
            query_result: result,
            ..Self::default()
        }
    }

    /// Fail every call with an API error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Documents created so far, in order.
    pub fn created(&self) -> Vec<Value> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent query and its parameters.
    pub fn last_query(&self) -> Option<(String, Vec<(String, Value)>)> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn check(&self) -> Result<(), SanityError> {
        if self.fail {
            return Err(SanityError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value, SanityError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((
                query.to_string(),
                params
                    .iter()
                    .map(|(name, value)| ((*name).to_string(), value.clone()))
                    .collect(),
            ));
        self.check()?;
        Ok(self.query_result.clone())
    }

    async fn create(&self, document: Value) -> Result<DocumentId, SanityError> {
        self.check()?;
        let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
        created.push(document);
        Ok(DocumentId::new(format!("order-{}", created.len())))
    }
}
