//! Integration tests for action classification and request validation.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use orders_relay_core::Action;
use orders_relay_integration_tests::{TestContext, post};
use serde_json::json;
use wiremock::matchers::any;
use wiremock::{Mock, ResponseTemplate};

/// Fails the test on drop if the relay reaches the upstream at all.
async fn forbid_upstream_calls(ctx: &TestContext) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&ctx.upstream)
        .await;
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_protected_actions_require_bearer() {
    let ctx = TestContext::new().await;
    forbid_upstream_calls(&ctx).await;

    for action in Action::ALL.into_iter().filter(|a| !a.is_public()) {
        let (status, body) = ctx
            .send(post(&json!({"action": action.as_str(), "orderId": "o-1"}), None))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{action} without bearer");
        assert_eq!(body, json!({"error": "No authorization token"}));
    }
}

#[tokio::test]
async fn test_every_local_action_is_handled_in_process() {
    let ctx = TestContext::new().await;
    forbid_upstream_calls(&ctx).await;

    let local: Vec<_> = Action::ALL
        .into_iter()
        .filter(|a| a.spec().is_local())
        .collect();
    assert!(!local.is_empty());

    for action in local {
        let (status, body) = ctx
            .send(post(&json!({"action": action.as_str()}), Some("t")))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{action}: {body}");
        assert!(body["error"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_missing_bearer_wins_over_bad_body() {
    let ctx = TestContext::new().await;

    for body in [json!({}), json!({"action": "explode"}), json!([1, 2, 3])] {
        let (status, _) = ctx.send(post(&body, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "body {body}");
    }
}

#[tokio::test]
async fn test_non_bearer_authorization_is_rejected() {
    let ctx = TestContext::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::from(json!({"action": "cancel"}).to_string()))
        .unwrap();

    let (status, _) = ctx.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Action validation
// =============================================================================

#[tokio::test]
async fn test_unknown_action_is_echoed() {
    let ctx = TestContext::new().await;
    forbid_upstream_calls(&ctx).await;

    let (status, body) = ctx
        .send(post(&json!({"action": "refund-everything"}), Some("t")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Unknown action: refund-everything"}));
}

#[tokio::test]
async fn test_missing_action_is_bad_request() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(post(&json!({"orderId": "o-1"}), Some("t"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("action"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let ctx = TestContext::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", "Bearer t")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = ctx.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn test_admin_action_requires_admin_email() {
    let ctx = TestContext::new().await;
    forbid_upstream_calls(&ctx).await;

    let (status, _) = ctx
        .send(post(&json!({"action": "accept-return", "orderId": "o-1"}), Some("t")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Methods
// =============================================================================

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let ctx = TestContext::new().await;

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let request = Request::builder()
            .method(method)
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let (status, body) = ctx.send(request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_options_is_acknowledged() {
    let ctx = TestContext::new().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let (status, _) = ctx.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = ctx.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}
