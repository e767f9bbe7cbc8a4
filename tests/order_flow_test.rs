//! End-to-end order flows: totals follow every item change, and orders
//! freeze once they leave `pending`.

mod common;

use axum::http::{Method, StatusCode};
use common::{money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn order_total_tracks_item_changes() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "25.50").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({
                "dealer_id": dealer.id,
                "delivery_address": "1 Harbour Road",
                "payment_method": "card",
                "items": [{ "substance_id": substance, "quantity": 2, "unit_price": "25.50" }]
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let order_id = body["data"]["order"]["id"].as_i64().unwrap();
    let first_item = body["data"]["items"][0]["id"].as_i64().unwrap();
    assert_eq!(money(&body["data"]["order"]["total_amount"]), dec!(51.00));
    assert_eq!(body["data"]["order"]["order_status"], "pending");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/order-items",
            Some(json!({
                "order_id": order_id,
                "substance_id": substance,
                "quantity": 2,
                "unit_price": "25.50"
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(money(&body["data"]["order_total"]), dec!(102.00));
    let second_item = body["data"]["item"]["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/order-items/{}", second_item),
            Some(json!({ "quantity": 1 })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(money(&body["data"]["order_total"]), dec!(76.50));

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/order-items/{}", first_item),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(money(&body["data"]["order_total"]), dec!(25.50));

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}", order_id),
            None,
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["data"]["order"]["total_amount"]), dec!(25.50));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn orders_need_at_least_one_item() {
    let app = TestApp::new().await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({
                "dealer_id": dealer.id,
                "delivery_address": "1 Harbour Road",
                "payment_method": "card",
                "items": []
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_pending_orders_reject_item_edits_and_deletion() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "10.00").await;
    let order_id = app.seed_order(&customer, &dealer, substance, 3, "10.00").await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/orders/{}/status", order_id),
            Some(json!({ "order_status": "processing" })),
            Some(&dealer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["order_status"], "processing");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/order-items",
            Some(json!({
                "order_id": order_id,
                "substance_id": substance,
                "quantity": 1,
                "unit_price": "10.00"
            })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/orders/{}", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(money(&body["data"]["order"]["total_amount"]), dec!(30.00));
}

#[tokio::test]
async fn order_lists_are_scoped_to_the_caller() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let alice = app.signup("customer", "alice").await;
    let bob = app.signup("customer", "bob").await;
    let substance = app.seed_substance(&provider, "Ethanol", "10.00").await;
    app.seed_order(&alice, &dealer, substance, 1, "10.00").await;
    app.seed_order(&alice, &dealer, substance, 2, "10.00").await;
    app.seed_order(&bob, &dealer, substance, 1, "10.00").await;

    let (_, body) = app
        .call(Method::GET, "/api/orders", None, Some(&alice.token))
        .await;
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app
        .call(Method::GET, "/api/orders?page=1&limit=2", None, Some(&dealer.token))
        .await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total_pages"], 2);

    let (status, _) = app
        .call(Method::GET, "/api/orders", None, Some(&provider.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn removing_the_last_item_zeroes_the_total() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "25.50").await;
    let order_id = app.seed_order(&customer, &dealer, substance, 2, "25.50").await;

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}/items", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    let item_id = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/order-items/{}", item_id),
            Some(json!({ "quantity": 4 })),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    // Recomputed totals keep two decimal places even after a store round trip.
    assert_eq!(body["data"]["order_total"], "102.00");
    assert_eq!(money(&body["data"]["item"]["sub_total"]), dec!(102.00));

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/order-items/{}", item_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["order_total"], "0.00");

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/orders/{}", order_id),
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(money(&body["data"]["order"]["total_amount"]), dec!(0));
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn amounts_beyond_the_money_column_are_rejected() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "1.00").await;

    let order = |lines: serde_json::Value| {
        json!({
            "dealer_id": dealer.id,
            "delivery_address": "1 Harbour Road",
            "payment_method": "card",
            "items": lines
        })
    };

    // Large enough to overflow the multiplication itself.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(order(json!([
                { "substance_id": substance, "quantity": 10, "unit_price": "10000000000000000000000000000" }
            ]))),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Each price fits, the line subtotal does not.
    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(order(json!([
                { "substance_id": substance, "quantity": 3, "unit_price": "9999999999.99" }
            ]))),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // Each line fits, their sum does not.
    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(order(json!([
                { "substance_id": substance, "quantity": 1, "unit_price": "9999999999.99" },
                { "substance_id": substance, "quantity": 1, "unit_price": "9999999999.99" }
            ]))),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, "/api/orders", None, Some(&customer.token))
        .await;
    assert_eq!(body["data"]["total"], 0);

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/substances/{}", substance),
            Some(json!({ "unit_price": "79000000000000000000000000" })),
            Some(&provider.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
