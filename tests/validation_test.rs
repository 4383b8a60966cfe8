//! Edge request validation tests

use crate::common::TestEdge;
use ecommerce_api::gateway::EdgeRequest;
use ecommerce_api::AppError;
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;

fn bad_request_message(err: AppError) -> String {
    match err {
        AppError::BadRequest(message) => message,
        other => panic!("expected a bad request, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_order_requires_both_parameters() {
    let edge = TestEdge::new();
    let token = edge.customer_web_token();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("DELETE", "/orders")
                .bearer(&token)
                .query_param("email", "shopper@example.com"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        bad_request_message(err),
        "Missing required request parameters: [orderId]"
    );

    let err = edge
        .gateway
        .dispatch(EdgeRequest::new("DELETE", "/orders").bearer(&token))
        .await
        .unwrap_err();
    assert_eq!(
        bad_request_message(err),
        "Missing required request parameters: [email, orderId]"
    );

    assert_eq!(edge.handler("ordersHandler").calls(), 0);
}

#[tokio::test]
async fn test_delete_order_with_parameters_reaches_handler() {
    let edge = TestEdge::new();

    edge.gateway
        .dispatch(
            EdgeRequest::new("DELETE", "/orders")
                .bearer(&edge.customer_web_token())
                .query_param("email", "shopper@example.com")
                .query_param("orderId", "o-1"),
        )
        .await
        .unwrap();

    let event = edge.handler("ordersHandler").last_event().unwrap();
    assert_eq!(
        event.query_string_parameters.get("orderId").map(String::as_str),
        Some("o-1")
    );
}

#[tokio::test]
async fn test_delete_order_with_text_body_reaches_handler() {
    let edge = TestEdge::new();
    let mut request = EdgeRequest::new("DELETE", "/orders")
        .bearer(&edge.customer_web_token())
        .query_param("email", "shopper@example.com")
        .query_param("orderId", "o-1");
    request.body = Some(b"not json".to_vec());

    edge.gateway.dispatch(request).await.unwrap();

    let event = edge.handler("ordersHandler").last_event().unwrap();
    assert_eq!(event.body, Some(json!("not json")));
}

#[tokio::test]
async fn test_unauthenticated_request_is_rejected_before_validation() {
    let edge = TestEdge::new();

    let err = edge
        .gateway
        .dispatch(EdgeRequest::new("DELETE", "/orders"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_order_requires_at_least_one_product() {
    let edge = TestEdge::new();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("POST", "/orders")
                .bearer(&edge.customer_web_token())
                .json_body(&json!({"productIds": [], "payment": "CASH"})),
        )
        .await
        .unwrap_err();

    let message = bad_request_message(err);
    assert!(message.starts_with("Invalid request body: ["), "{}", message);
    assert!(message.contains("/productIds"), "{}", message);
    assert_eq!(edge.handler("ordersHandler").calls(), 0);
}

#[tokio::test]
async fn test_order_rejects_unknown_payment() {
    let edge = TestEdge::new();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("POST", "/orders")
                .bearer(&edge.admin_web_token())
                .json_body(&json!({"productIds": ["p1"], "payment": "BITCOIN"})),
        )
        .await
        .unwrap_err();

    assert!(bad_request_message(err).contains("/payment"));
}

#[tokio::test]
async fn test_valid_order_reaches_handler() {
    let edge = TestEdge::new();
    let body = json!({"productIds": ["p1"], "payment": "CASH"});

    let response = edge
        .gateway
        .dispatch(
            EdgeRequest::new("POST", "/orders")
                .bearer(&edge.customer_web_token())
                .json_body(&body),
        )
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    let event = edge.handler("ordersHandler").last_event().unwrap();
    assert_eq!(event.body, Some(body));
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let edge = TestEdge::new();
    let mut request = EdgeRequest::new("POST", "/orders").bearer(&edge.customer_web_token());
    request.body = Some(b"{\"productIds\": [".to_vec());

    let err = edge.gateway.dispatch(request).await.unwrap_err();

    assert!(bad_request_message(err).starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_product_requires_code() {
    let edge = TestEdge::new();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("POST", "/products")
                .bearer(&edge.admin_web_token())
                .json_body(&json!({"productName": "Desk"})),
        )
        .await
        .unwrap_err();

    assert!(bad_request_message(err).contains("code"));
    assert_eq!(edge.handler("productsAdminHandler").calls(), 0);
}

#[tokio::test]
async fn test_product_update_shares_validator() {
    let edge = TestEdge::new();
    let token = edge.admin_web_token();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("PUT", "/products/p-1")
                .bearer(&token)
                .json_body(&json!({"code": "D-1"})),
        )
        .await
        .unwrap_err();
    assert!(bad_request_message(err).contains("productName"));

    edge.gateway
        .dispatch(
            EdgeRequest::new("PUT", "/products/p-1")
                .bearer(&token)
                .json_body(&json!({"productName": "Desk", "code": "D-1", "price": 120})),
        )
        .await
        .unwrap();
    assert_eq!(edge.handler("productsAdminHandler").calls(), 1);
}

#[tokio::test]
async fn test_order_events_require_email() {
    let edge = TestEdge::new();
    let token = edge.customer_web_token();

    let err = edge
        .gateway
        .dispatch(
            EdgeRequest::new("GET", "/orders/events")
                .bearer(&token)
                .query_param("eventType", "ORDER_CREATED"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        bad_request_message(err),
        "Missing required request parameters: [email]"
    );

    edge.gateway
        .dispatch(
            EdgeRequest::new("GET", "/orders/events")
                .bearer(&token)
                .query_param("email", "shopper@example.com"),
        )
        .await
        .unwrap();
    assert_eq!(edge.handler("orderEventsFetchHandler").calls(), 1);
}

#[tokio::test]
async fn test_unvalidated_method_passes_body_through() {
    let edge = TestEdge::new();

    edge.gateway
        .dispatch(
            EdgeRequest::new("GET", "/orders")
                .bearer(&edge.customer_web_token())
                .query_param("email", "shopper@example.com"),
        )
        .await
        .unwrap();

    let event = edge.handler("ordersHandler").last_event().unwrap();
    assert_eq!(event.body, None);
}
