mod common;

use axum::body::Body;
use axum::http::Request;
use common::*;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_reports_service_identity() {
    let t = harness();
    let (status, body) = get(&t.app, "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "identity-service");
}

#[tokio::test]
async fn serves_the_openapi_document() {
    let t = harness();
    let (status, body) = get(&t.app, "/.well-known/openapi.json", None).await;
    assert_eq!(status, 200);
    assert!(body.get("openapi").is_some());
    assert!(body["paths"].get("/v1beta1/check").is_some());
}

#[tokio::test]
async fn echoes_inbound_request_id_and_mints_one_when_absent() {
    let t = harness();

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-abc-123"
    );

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let minted = response.headers().get("x-request-id").unwrap();
    assert!(!minted.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_principal_is_rejected_at_the_middleware() {
    let t = harness();
    let user = t.stub.seed_user("u1", "jane", "jane@example.com");
    t.stub.token_for_user("user-token", &user);
    t.stub.disabled_tokens.lock().unwrap().insert("user-token".to_string());

    let (status, body) = get(&t.app, "/v1beta1/users/self", Some("user-token")).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "principal is disabled");
}

#[tokio::test]
async fn unknown_token_falls_through_to_the_route_guard() {
    let t = harness();
    let (status, _) = get(&t.app, "/v1beta1/users/self", Some("bogus-token")).await;
    assert_eq!(status, 401);

    // routes without a caller requirement still work
    let (status, _) = get(&t.app, "/v1beta1/organizations", Some("bogus-token")).await;
    assert_eq!(status, 200);
}
