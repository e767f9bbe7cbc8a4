mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

async fn order_status(app: &TestApp, order_id: i32, token: &str) -> Value {
    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}", order_id),
            None,
            Some(token),
        )
        .await;
    body["data"]["order"]["order_status"].clone()
}

#[tokio::test]
async fn shipment_status_drives_order_status() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "4.00").await;
    let order_id = app.seed_order(&customer, &dealer, substance, 1, "4.00").await;

    // Customers cannot ship their own orders.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/shipments",
            Some(json!({ "order_id": order_id, "carrier": "DHL" })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/shipments",
            Some(json!({ "order_id": order_id, "carrier": "DHL", "tracking_number": "JD014600" })),
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["shipment"]["status"], "preparing");
    assert_eq!(body["data"]["order_status"], "processing");
    let shipment_id = body["data"]["shipment"]["id"].as_i64().unwrap();
    assert_eq!(order_status(&app, order_id, &customer.token).await, "processing");

    for (shipment_status, expected) in [
        ("in_transit", "shipped"),
        ("delivered", "delivered"),
        ("preparing", "processing"),
        ("failed", "cancelled"),
    ] {
        let (status, body) = app
            .call(
                Method::PUT,
                &format!("/api/shipments/{}", shipment_id),
                Some(json!({ "status": shipment_status })),
                Some(&dealer.token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["order_status"], expected);
        assert_eq!(order_status(&app, order_id, &customer.token).await, expected);
    }

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}/shipment", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["carrier"], "DHL");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/shipments/{}", shipment_id),
            None,
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order_status(&app, order_id, &customer.token).await, "cancelled");

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}/shipment", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn an_order_has_at_most_one_shipment() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "4.00").await;
    let order_id = app.seed_order(&customer, &dealer, substance, 1, "4.00").await;

    let payload = json!({ "order_id": order_id, "carrier": "UPS", "status": "in_transit" });
    let (status, body) = app
        .call(Method::POST, "/api/shipments", Some(payload.clone()), Some(&dealer.token))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["order_status"], "shipped");

    let (status, _) = app
        .call(Method::POST, "/api/shipments", Some(payload), Some(&dealer.token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shipping_a_missing_order_is_not_found() {
    let app = TestApp::new().await;
    let dealer = app.signup("dealer", "corner-shop").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/shipments",
            Some(json!({ "order_id": 999, "carrier": "UPS" })),
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
