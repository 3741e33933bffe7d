//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::sanity::{ContentStore, SanityClient, SanityError};
use crate::services::{CatalogService, CheckoutService, OrderRecorder};
use crate::stripe::{PaymentProvider, StripeClient, StripeError};

/// Error building the provider clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientInitError {
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("sanity client: {0}")]
    Sanity(#[from] SanityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Provider clients are built
/// once at startup and reached only through the services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogService,
    checkout: CheckoutService,
    orders: OrderRecorder,
}

impl AppState {
    /// Create the application state with the Stripe and Sanity HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if either client cannot be built from the
    /// configuration.
    pub fn new(config: StorefrontConfig) -> Result<Self, ClientInitError> {
        let payments = Arc::new(StripeClient::new(&config.stripe)?);
        let store = Arc::new(SanityClient::new(&config.sanity)?);
        Ok(Self::with_providers(config, payments, store))
    }

    /// Create the application state around the given providers.
    #[must_use]
    pub fn with_providers(
        config: StorefrontConfig,
        payments: Arc<dyn PaymentProvider>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let checkout = CheckoutService::new(payments.clone(), config.checkout_settings());
        let catalog = CatalogService::new(store.clone());
        let orders = OrderRecorder::new(payments, store);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                checkout,
                orders,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the order recorder.
    #[must_use]
    pub fn orders(&self) -> &OrderRecorder {
        &self.inner.orders
    }
}
