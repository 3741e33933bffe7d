//! Integration tests for Basketry.
//!
//! The storefront router is driven in-process with `tower::ServiceExt::oneshot`.
//! Stripe and Sanity are replaced by the in-memory providers from
//! `basketry_storefront::testing`, so no network or credentials are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p basketry-integration-tests
//! ```

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use basketry_core::CurrencyCode;
use basketry_storefront::config::{SanityConfig, StorefrontConfig, StripeConfig};
use basketry_storefront::routes;
use basketry_storefront::state::AppState;
use basketry_storefront::stripe::webhook::{SIGNATURE_HEADER, signature_header};
use basketry_storefront::testing::{FakePayments, FakeStore};
use secrecy::SecretString;
use serde_json::Value;

pub use basketry_storefront::testing::line_item;

/// Signing secret the test app is configured with.
pub const WEBHOOK_SECRET: &str = "whsec_Zk93LmQpR7vTx2Nd";

/// Configuration pointing nowhere; providers are always faked.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        deployment_host: None,
        base_url: Some("https://shop.test".to_string()),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            webhook_secret: Some(SecretString::from(WEBHOOK_SECRET)),
            api_base: "http://127.0.0.1:9".to_string(),
            currency: CurrencyCode::GBP,
            webhook_tolerance_secs: 300,
        },
        sanity: SanityConfig {
            project_id: "test-project".to_string(),
            dataset: "test".to_string(),
            api_version: "2024-11-01".to_string(),
            api_token: SecretString::from("skQv7Lr2NwXe9TpZc4Hb8YmK"),
            api_host: Some("http://127.0.0.1:9".to_string()),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The storefront app with fake providers.
pub struct TestApp {
    pub router: Router,
    pub payments: Arc<FakePayments>,
    pub store: Arc<FakeStore>,
}

impl TestApp {
    #[must_use]
    pub fn new(payments: FakePayments, store: FakeStore) -> Self {
        Self::with_config(test_config(), payments, store)
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig, payments: FakePayments, store: FakeStore) -> Self {
        let payments = Arc::new(payments);
        let store = Arc::new(store);
        let state = AppState::with_providers(config, payments.clone(), store.clone());

        Self {
            router: routes::app(state),
            payments,
            store,
        }
    }
}

/// A webhook request signed with [`WEBHOOK_SECRET`] at the current time.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn signed_webhook(payload: &str) -> Request<Body> {
    let header = signature_header(
        payload.as_bytes(),
        &SecretString::from(WEBHOOK_SECRET),
        chrono::Utc::now().timestamp(),
    );

    Request::post("/webhook")
        .header(SIGNATURE_HEADER, header)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("valid request")
}

/// A JSON `POST`.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
#[allow(clippy::expect_used)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
