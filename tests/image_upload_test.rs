mod common;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{response_json, TestApp};

const BOUNDARY: &str = "marketplace-test-boundary";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

fn upload(uri: &str, token: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut payload = Vec::new();
    payload.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(bytes);
    payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn provider_uploads_and_anyone_reads_a_substance_image() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let rival = app.signup("provider", "rival-labs").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "3.00").await;
    let uri = format!("/api/images/substances/{}", substance);

    let (status, body) = app
        .call(Method::GET, &format!("{}/exists", uri), None, Some(&customer.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_image"], false);

    let response = app.send(upload(&uri, &rival.token, "logo.png", PNG_BYTES)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(upload(&uri, &provider.token, "notes.txt", b"plain text"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(upload(&uri, &provider.token, "logo.PNG", PNG_BYTES))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["has_image"], true);
    assert_eq!(body["data"]["kind"], "substances");

    let (_, body) = app
        .call(Method::GET, &format!("{}/exists", uri), None, Some(&customer.token))
        .await;
    assert_eq!(body["data"]["has_image"], true);

    let response = app.request(Method::GET, &uri, None, Some(&customer.token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PNG_BYTES);
}

#[tokio::test]
async fn account_images_are_private_to_customers() {
    let app = TestApp::new().await;
    let alice = app.signup("customer", "alice").await;
    let bob = app.signup("customer", "bob").await;
    let uri = format!("/api/images/customers/{}", alice.id);

    let response = app.send(upload(&uri, &alice.token, "me.jpg", b"jpeg-bytes")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = app.call(Method::GET, &uri, None, Some(&bob.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app.request(Method::GET, &uri, None, Some(&alice.token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let (status, _) = app
        .call(Method::GET, "/api/images/customers/999/exists", None, Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No image stored yet for bob.
    let (status, _) = app
        .call(Method::GET, &format!("/api/images/customers/{}", bob.id), None, Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let uri = format!("/api/images/providers/{}", provider.id);

    let too_big = vec![7u8; 70 * 1024];
    let response = app.send(upload(&uri, &provider.token, "big.png", &too_big)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, &format!("{}/exists", uri), None, Some(&provider.token))
        .await;
    assert_eq!(body["data"]["has_image"], false);
}
