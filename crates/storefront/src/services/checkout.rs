//! Checkout session creation.
//!
//! Turns a validated basket into a hosted Stripe checkout session and hands
//! back the URL the buyer is redirected to. Every check that does not need
//! Stripe runs before the first request goes out.

use std::sync::Arc;

use basketry_core::{
    BasketError, CurrencyCode, GroupedBasketItem, MetadataError, OrderMetadata, PriceError,
    ProductId, major_to_minor, validate_basket,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::stripe::{
    CreateCheckoutSession, PaymentProvider, SessionCustomer, SessionLineItem, StripeError,
};

/// Placeholder Stripe substitutes with the session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors that can occur when creating a checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The basket failed validation.
    #[error(transparent)]
    Basket(#[from] BasketError),

    /// The order metadata cannot be attached to a session.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Neither a deployment host nor a base URL is configured.
    #[error("No redirect base URL configured (set DEPLOYMENT_HOST or STOREFRONT_BASE_URL)")]
    MissingBaseUrl,

    /// A price cannot be expressed in minor units.
    #[error("Invalid price for product {product}: {source}")]
    Price {
        product: ProductId,
        #[source]
        source: PriceError,
    },

    /// Stripe rejected a request.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Stripe created the session but returned no hosted URL.
    #[error("Stripe returned a checkout session without a URL")]
    MissingSessionUrl,
}

/// Configuration the checkout service reads.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Host of the current deployment, e.g. `shop-git-main.vercel.app`.
    pub deployment_host: Option<String>,
    /// Public base URL used when no deployment host is set.
    pub base_url: Option<String>,
    pub currency: CurrencyCode,
    /// Used to resolve product images to CDN URLs.
    pub sanity_project_id: String,
    pub sanity_dataset: String,
}

impl CheckoutSettings {
    /// Base URL for success and cancel redirects, without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingBaseUrl`] if neither source is set.
    pub fn redirect_base(&self) -> Result<String, CheckoutError> {
        if let Some(host) = &self.deployment_host {
            return Ok(format!("https://{}", host.trim_end_matches('/')));
        }

        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or(CheckoutError::MissingBaseUrl)
    }
}

/// Creates Stripe checkout sessions for baskets.
#[derive(Clone)]
pub struct CheckoutService {
    payments: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    #[must_use]
    pub fn new(payments: Arc<dyn PaymentProvider>, settings: CheckoutSettings) -> Self {
        Self { payments, settings }
    }

    /// Create a checkout session and return its hosted URL.
    ///
    /// Failures are logged and returned unchanged; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Basket`] for an empty basket, a missing or
    /// non-positive price, or a zero quantity; these are reported before
    /// Stripe is contacted. Configuration and Stripe failures are returned
    /// as their own variants.
    #[instrument(
        skip(self, items, metadata),
        fields(order_number = %metadata.order_number, items = items.len())
    )]
    pub async fn create_checkout_session(
        &self,
        items: &[GroupedBasketItem],
        metadata: &OrderMetadata,
    ) -> Result<String, CheckoutError> {
        let result = self.try_create_checkout_session(items, metadata).await;
        if let Err(e) = &result {
            error!(error = %e, "Error creating checkout session");
        }
        result
    }

    async fn try_create_checkout_session(
        &self,
        items: &[GroupedBasketItem],
        metadata: &OrderMetadata,
    ) -> Result<String, CheckoutError> {
        validate_basket(items)?;
        metadata.validate()?;
        let base = self.settings.redirect_base()?;
        let line_items = self.line_items(items)?;

        let customer = match self
            .payments
            .find_customer_by_email(&metadata.customer_email)
            .await?
        {
            Some(customer) => {
                debug!(customer_id = %customer.id, "Reusing Stripe customer");
                SessionCustomer::Existing(customer.id)
            }
            None => SessionCustomer::CreateFor(metadata.customer_email.clone()),
        };

        let params = CreateCheckoutSession {
            customer,
            metadata: metadata.clone(),
            line_items,
            success_url: success_url(&base, &metadata.order_number),
            cancel_url: format!("{base}/basket"),
            allow_promotion_codes: true,
        };

        let session = self.payments.create_checkout_session(&params).await?;
        let url = session.url.ok_or(CheckoutError::MissingSessionUrl)?;

        info!(session_id = %session.id, "Checkout session created");
        Ok(url)
    }

    fn line_items(
        &self,
        items: &[GroupedBasketItem],
    ) -> Result<Vec<SessionLineItem>, CheckoutError> {
        items
            .iter()
            .map(|item| {
                let product = &item.product;
                let price = item
                    .checkout_price()
                    .ok_or_else(|| BasketError::MissingPrice(product.id.clone()))?;
                let unit_amount = major_to_minor(price).map_err(|source| CheckoutError::Price {
                    product: product.id.clone(),
                    source,
                })?;
                let images = product
                    .image
                    .as_ref()
                    .and_then(|image| {
                        image.cdn_url(
                            &self.settings.sanity_project_id,
                            &self.settings.sanity_dataset,
                        )
                    })
                    .into_iter()
                    .collect();

                Ok(SessionLineItem {
                    currency: self.settings.currency,
                    unit_amount,
                    name: product.display_name().to_string(),
                    description: format!("Product ID: {}", product.id),
                    images,
                    product_id: product.id.clone(),
                    quantity: item.quantity,
                })
            })
            .collect()
    }
}

/// Success redirect with the session placeholder kept literal.
fn success_url(base: &str, order_number: &str) -> String {
    format!(
        "{base}/success?session_id={SESSION_ID_PLACEHOLDER}&orderNumber={}",
        urlencoding::encode(order_number)
    )
}
