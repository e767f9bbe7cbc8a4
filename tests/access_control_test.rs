//! Ownership checks across account kinds, enforced by the policy table.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn customers_only_see_their_own_profile() {
    let app = TestApp::new().await;
    let alice = app.signup("customer", "alice").await;
    let bob = app.signup("customer", "bob").await;

    let (status, _) = app
        .call(Method::GET, &format!("/api/customers/{}", alice.id), None, Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, &format!("/api/customers/{}", alice.id), None, Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/customers/{}", alice.id),
            Some(json!({ "phone": "555-0100" })),
            Some(&bob.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/customers/{}", alice.id),
            Some(json!({ "phone": "555-0100" })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "555-0100");

    let (status, _) = app
        .call(Method::GET, "/api/customers/999", None, Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_private_to_their_parties() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let other_dealer = app.signup("dealer", "big-box").await;
    let alice = app.signup("customer", "alice").await;
    let bob = app.signup("customer", "bob").await;
    let substance = app.seed_substance(&provider, "Ethanol", "3.00").await;
    let order_id = app.seed_order(&alice, &dealer, substance, 1, "3.00").await;
    let uri = format!("/api/orders/{}", order_id);

    for token in [&bob.token, &other_dealer.token, &provider.token] {
        let (status, _) = app.call(Method::GET, &uri, None, Some(token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // The fulfilling dealer shares alice's numeric id but is not the customer.
    assert_eq!(dealer.id, alice.id);
    let (status, _) = app
        .call(
            Method::PUT,
            &uri,
            Some(json!({ "payment_method": "cash" })),
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("{}/status", uri),
            Some(json!({ "order_status": "shipped" })),
            Some(&alice.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/order-items",
            Some(json!({ "order_id": order_id, "substance_id": substance, "quantity": 1, "unit_price": "3.00" })),
            Some(&bob.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn catalog_writes_belong_to_the_owner() {
    let app = TestApp::new().await;
    let acme = app.signup("provider", "acme-labs").await;
    let rival = app.signup("provider", "rival-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&acme, "Ethanol", "3.00").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/substances",
            Some(json!({ "name": "Bleach", "unit_price": "1.00" })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/substances/{}", substance),
            Some(json!({ "unit_price": "0.01" })),
            Some(&rival.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/substances?provider_id={}", acme.id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/inventory",
            Some(json!({ "substance_id": substance, "quantity_available": 12, "unit_price": "4.50" })),
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let inventory_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["dealer_id"], dealer.id);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/inventory/{}", inventory_id),
            None,
            Some(&acme.token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Transports are hidden from customers entirely.
    let (status, _) = app
        .call(Method::GET, "/api/provider-transports", None, Some(&customer.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn referenced_accounts_cannot_be_deleted() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    app.seed_substance(&provider, "Ethanol", "3.00").await;

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/providers/{}", provider.id),
            None,
            Some(&provider.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let lonely = app.signup("provider", "lonely-labs").await;
    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/providers/{}", lonely.id),
            None,
            Some(&lonely.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], lonely.id);
}
