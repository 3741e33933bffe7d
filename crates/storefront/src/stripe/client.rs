//! Stripe REST API client.

use async_trait::async_trait;
use basketry_core::{CheckoutSessionId, Email};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::types::{CheckoutSession, CreateCheckoutSession, Customer, LineItem, List};
use super::{PaymentProvider, StripeError};
use crate::config::StripeConfig;

/// Page size used when listing line items (Stripe maximum).
const LINE_ITEM_PAGE_SIZE: &str = "100";

/// Stripe API client for customers and checkout sessions.
#[derive(Clone)]
pub struct StripeClient {
    /// HTTP client.
    client: Client,
    /// API root, e.g. `https://api.stripe.com`.
    api_base: Url,
    /// Secret API key.
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Error envelope returned by Stripe on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the API base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| StripeError::Parse(format!("Invalid Stripe API base: {e}")))?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_base,
            secret_key: config.secret_key.clone(),
        })
    }

    /// Build an endpoint URL under `/v1`.
    fn endpoint(&self, path: &str) -> Result<Url, StripeError> {
        self.api_base
            .join(&format!("v1/{path}"))
            .map_err(|e| StripeError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    /// Send a request and decode the JSON body, mapping Stripe errors.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StripeError> {
        let response = request
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body).map_or(body, |e| {
                match (e.error.kind, e.error.message) {
                    (Some(kind), Some(message)) => format!("{kind}: {message}"),
                    (None, Some(message)) => message,
                    (Some(kind), None) => kind,
                    (None, None) => "Unknown error".to_string(),
                }
            });
            error!(status = status.as_u16(), %message, "Stripe API error");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, email))]
    async fn find_customer_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, StripeError> {
        let mut url = self.endpoint("customers")?;
        url.query_pairs_mut()
            .append_pair("email", email.as_str())
            .append_pair("limit", "1");

        let customers: List<Customer> = self.send(self.client.get(url)).await?;
        let customer = customers.data.into_iter().next();

        debug!(found = customer.is_some(), "Stripe customer lookup");
        Ok(customer)
    }

    #[instrument(skip(self, params), fields(order_number = %params.metadata.order_number))]
    async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        let url = self.endpoint("checkout/sessions")?;
        let session: CheckoutSession = self
            .send(self.client.post(url).form(&params.to_form()))
            .await?;

        debug!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn list_line_items(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Vec<LineItem>, StripeError> {
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut url = self.endpoint(&format!("checkout/sessions/{session_id}/line_items"))?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("limit", LINE_ITEM_PAGE_SIZE)
                    .append_pair("expand[]", "data.price.product");
                if let Some(cursor) = &starting_after {
                    query.append_pair("starting_after", cursor);
                }
            }

            let page: List<LineItem> = self.send(self.client.get(url)).await?;
            starting_after = page.data.last().map(|item| item.id.clone());
            items.extend(page.data);

            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        debug!(count = items.len(), "Fetched session line items");
        Ok(items)
    }
}
