//! HTTP edge tests driven through the axum router

use crate::common::TestEdge;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ecommerce_api::middleware::edge_router;
use ecommerce_api::server::{build_gateway, echo_registry};
use ecommerce_api::surface::handler_targets;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

struct TestApp {
    edge: TestEdge,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let edge = TestEdge::new();
        let gateway = build_gateway(&edge.config, echo_registry(&handler_targets(&edge.config)))
            .expect("gateway should build");
        Self {
            router: edge_router(Arc::new(gateway), None),
            edge,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body, request_id)
    }
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(path: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::new();

    let (status, body, _) = app.send(get("/carts", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_root_has_no_methods() {
    let app = TestApp::new();

    let (status, _, _) = app.send(get("/", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unbound_verb_is_method_not_allowed() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("PATCH")
        .uri("/orders")
        .body(Body::empty())
        .unwrap();

    let (status, _, _) = app.send(request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, body, _) = app.send(get("/products", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_insufficient_scope_is_forbidden() {
    let app = TestApp::new();
    let token = app.edge.customer_mobile_token();

    let (status, _, _) = app.send(get("/orders", Some(&token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_echo_handler_receives_query() {
    let app = TestApp::new();
    let token = app.edge.customer_web_token();

    let (status, body, request_id) = app
        .send(get("/orders?email=shopper%40example.com&orderId=o-1", Some(&token)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handler"], "ordersHandler");
    assert_eq!(
        body["event"]["queryStringParameters"]["email"],
        "shopper@example.com"
    );
    assert_eq!(body["event"]["resource"], "/orders");
    assert_eq!(
        body["event"]["requestContext"]["requestId"].as_str(),
        request_id.as_deref()
    );
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let app = TestApp::new();
    let token = app.edge.customer_web_token();

    let (status, body, _) = app
        .send(post_json(
            "/orders",
            &token,
            &json!({"productIds": [], "payment": "CASH"}),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new();
    let token = app.edge.admin_web_token();
    let request = Request::builder()
        .method("GET")
        .uri("/products/p-1")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let (status, body, request_id) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.as_deref(), Some("req-123"));
    assert_eq!(body["event"]["requestContext"]["requestId"], "req-123");
    assert_eq!(body["event"]["pathParameters"]["id"], "p-1");
}

#[tokio::test]
async fn test_metrics_disabled() {
    let app = TestApp::new();

    let (status, _, _) = app.send(get("/metrics", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
