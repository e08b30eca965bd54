//! Router-level checks that resolve before any database access: principal
//! headers, role guards, ownership of path ids and request validation.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn missing_principal_is_unauthorized() {
    let app = TestApp::offline();

    let response = app.request(Method::GET, "/cart", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["kind"], "UnauthorizedError");
    assert!(response.body["error"].as_str().is_some());
}

#[tokio::test]
async fn unknown_role_is_unauthorized() {
    let app = TestApp::offline();

    let response = app
        .request(Method::GET, "/orders", Some(("admin", 1)), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["kind"], "UnauthorizedError");
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let app = TestApp::offline();

    for (method, uri) in [
        (Method::GET, "/cart"),
        (Method::POST, "/cart/checkout"),
        (Method::GET, "/orders"),
    ] {
        let response = app.request(method, uri, Some(("doctor", 1)), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(response.body["kind"], "ForbiddenError");
    }

    let response = app
        .request(Method::GET, "/pharmacy/1/stock", Some(("customer", 1)), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/agents/1/suborders", Some(("pharmacy", 1)), None)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn customers_cannot_drive_sub_orders_or_review() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::PUT,
            "/suborders/1/1/status",
            Some(("customer", 1)),
            Some(json!({ "status": "Assigned" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["kind"], "ForbiddenError");

    let response = app
        .request(
            Method::POST,
            "/prescriptions/1/review",
            Some(("customer", 1)),
            Some(json!({ "decision": "Verified" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            "/prescriptions",
            Some(("doctor", 1)),
            Some(json!({ "file_ref": "s3://rx/1.pdf" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn path_ids_must_match_the_principal() {
    let app = TestApp::offline();

    let cases = [
        (Method::GET, "/cart?customer=2", ("customer", 1), None),
        (Method::GET, "/pharmacy/5/stock", ("pharmacy", 4), None),
        (Method::GET, "/pharmacy/5/suborders", ("pharmacy", 4), None),
        (Method::GET, "/stock/5/1", ("pharmacy", 4), None),
        (
            Method::PUT,
            "/stock/5/1",
            ("pharmacy", 4),
            Some(json!({ "quantity": 10, "unit_price": "12.50" })),
        ),
        (Method::GET, "/agents/3/suborders", ("delivery_agent", 2), None),
    ];

    for (method, uri, principal, body) in cases {
        let response = app.request(method, uri, Some(principal), body).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(response.body["kind"], "NotOwnerError", "{}", uri);
    }
}

#[tokio::test]
async fn invalid_requests_are_validation_errors() {
    let app = TestApp::offline();

    let response = app
        .request(
            Method::POST,
            "/cart/items",
            Some(("customer", 1)),
            Some(json!({ "medicine_id": 1, "quantity": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "ValidationError");

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/cart/items")
        .header("x-principal-role", "customer")
        .header("x-principal-id", "1")
        .header("content-type", "application/json")
        .body(Body::from("{\"medicine_id\": "))
        .unwrap();
    let response = app.send(malformed).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "ValidationError");

    let response = app
        .request(Method::DELETE, "/cart/items/abc", Some(("customer", 1)), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            "/stock/4/1",
            Some(("pharmacy", 4)),
            Some(json!({ "quantity": -1, "unit_price": "1.00" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/prescriptions",
            Some(("customer", 1)),
            Some(json!({ "file_ref": "   " })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/prescriptions/1/review",
            Some(("doctor", 1)),
            Some(json!({ "decision": "To Be Verified" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            "/suborders/1/1/status",
            Some(("pharmacy", 1)),
            Some(json!({ "status": "Teleported" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({
                "role": "customer",
                "name": "Somchai",
                "email": "not-an-email",
                "phone": "0812345678",
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "ValidationError");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::offline();

    let response = app.request(Method::GET, "/cart", None, None).await;

    let request_id = response.request_id.expect("x-request-id header");
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn slow_requests_time_out_with_a_retryable_error() {
    // The pool keeps retrying the unreachable database well past the
    // request deadline.
    let app = TestApp::offline_with(&[
        ("REQUEST_TIMEOUT_SECS", "1"),
        ("DB_ACQUIRE_TIMEOUT_SECS", "30"),
    ]);

    let response = app
        .request(Method::POST, "/cart/checkout", Some(("customer", 1)), None)
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["kind"], "ServiceBusy");
    assert_eq!(response.body["error"], "Request timed out, retry the request");
    assert!(response.request_id.is_some());
}

#[tokio::test]
async fn openapi_document_lists_the_workflow() {
    let app = TestApp::offline();

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let paths = response.body["paths"].as_object().expect("paths");
    for path in [
        "/register",
        "/cart/items",
        "/cart/checkout",
        "/prescriptions/{id}/review",
        "/suborders/{order_id}/{sub_order_id}/status",
        "/stock/{pharmacy_id}/{medicine_id}",
    ] {
        assert!(paths.contains_key(path), "{} missing", path);
    }
    assert!(response.body["components"]["securitySchemes"]["principalRole"].is_object());
}
