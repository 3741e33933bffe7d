//! Checkout endpoint.

use axum::http::StatusCode;
use basketry_core::CurrencyCode;
use basketry_integration_tests::{TestApp, json_body, json_post};
use basketry_storefront::stripe::SessionCustomer;
use basketry_storefront::testing::{FakePayments, FakeStore};
use serde_json::{Value, json};
use tower::ServiceExt;

fn metadata() -> Value {
    json!({
        "orderNumber": "ORD-42",
        "customerName": "Grace Hopper",
        "customerEmail": "grace@example.com",
        "userId": "user_42"
    })
}

fn product(id: &str, price: Option<f64>) -> Value {
    json!({ "_id": id, "name": format!("Product {id}"), "slug": { "current": id }, "price": price })
}

#[tokio::test]
async fn test_checkout_returns_session_url() {
    let app = TestApp::new(FakePayments::default(), FakeStore::default());
    let body = json!({
        "items": [
            { "product": product("mug", Some(9.99)), "quantity": 1 },
            { "product": product("tee", Some(20.0)), "quantity": 2 },
            { "product": product("mug", Some(9.99)), "quantity": 2 }
        ],
        "metadata": metadata()
    });

    let response = app
        .router
        .oneshot(json_post("/api/checkout", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "url": FakePayments::SESSION_URL })
    );

    let params = app.payments.last_session_params().unwrap();
    assert!(matches!(params.customer, SessionCustomer::CreateFor(_)));
    assert_eq!(params.metadata.order_number, "ORD-42");

    let lines: Vec<(&str, i64, u32)> = params
        .line_items
        .iter()
        .map(|line| (line.product_id.as_str(), line.unit_amount, line.quantity))
        .collect();
    assert_eq!(lines, vec![("mug", 999, 3), ("tee", 2000, 2)]);
    assert!(params.line_items.iter().all(|line| line.currency == CurrencyCode::GBP));
    assert_eq!(
        params.success_url,
        "https://shop.test/success?session_id={CHECKOUT_SESSION_ID}&orderNumber=ORD-42"
    );
}

#[tokio::test]
async fn test_checkout_reuses_existing_customer() {
    let app = TestApp::new(
        FakePayments::default().with_customer("cus_grace"),
        FakeStore::default(),
    );
    let body = json!({
        "items": [{ "product": product("mug", Some(5.0)), "quantity": 1 }],
        "metadata": metadata()
    });

    let response = app
        .router
        .oneshot(json_post("/api/checkout", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let params = app.payments.last_session_params().unwrap();
    assert!(matches!(
        params.customer,
        SessionCustomer::Existing(ref id) if id.as_str() == "cus_grace"
    ));
}

#[tokio::test]
async fn test_unpriced_item_fails_without_calling_stripe() {
    let app = TestApp::new(FakePayments::default(), FakeStore::default());
    let body = json!({
        "items": [
            { "product": product("mug", Some(5.0)), "quantity": 1 },
            { "product": product("free", None), "quantity": 1 }
        ],
        "metadata": metadata()
    });

    let response = app
        .router
        .oneshot(json_post("/api/checkout", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Some items do not have a price: free" })
    );
    assert_eq!(app.payments.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new(FakePayments::default(), FakeStore::default());
    let body = json!({ "items": [], "metadata": { "orderNumber": "ORD-1" } });

    let response = app
        .router
        .oneshot(json_post("/api/checkout", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.payments.call_count(), 0);
}

#[tokio::test]
async fn test_stripe_failure_is_bad_gateway() {
    let app = TestApp::new(FakePayments::default().failing(), FakeStore::default());
    let body = json!({
        "items": [{ "product": product("mug", Some(5.0)), "quantity": 1 }],
        "metadata": metadata()
    });

    let response = app
        .router
        .oneshot(json_post("/api/checkout", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Payment provider error" })
    );
}
