use anilist_token_relay_lib::{build_router, RelayState};
use axum::http::{header, Method, StatusCode};
use serde_json::json;

mod support;
use support::{
    router_with, sample_body, secret, send, send_bytes, send_with_headers, FakeGateway, FakeMode,
    SECRET,
};

const OVERSIZED_BODY_BYTES: usize = 3 * 1024 * 1024;

#[tokio::test]
async fn successful_exchange_is_passed_through() {
    let provider_body = json!({"access_token": "tok1", "token_type": "Bearer", "expires_in": 3600});
    let gateway = FakeGateway::replying(StatusCode::OK, provider_body.clone());
    let router = router_with(gateway.clone(), secret());

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json, provider_body);
    assert_eq!(
        resp.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn outbound_request_carries_four_fields_plus_secret() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let router = router_with(gateway.clone(), secret());

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;
    assert_eq!(resp.status, StatusCode::OK);

    let seen = gateway.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        serde_json::to_value(&seen[0]).expect("encode"),
        json!({
            "grant_type": "authorization_code",
            "client_id": "29214",
            "client_secret": SECRET,
            "redirect_uri": "myanilistapp://auth",
            "code": "abc123"
        })
    );
    assert!(!resp.raw.contains(SECRET));
}

#[tokio::test]
async fn provider_rejection_keeps_status_and_body() {
    let provider_body = json!({
        "error": "invalid_grant",
        "error_description": "Invalid authorization code"
    });
    let gateway = FakeGateway::replying(StatusCode::BAD_REQUEST, provider_body.clone());
    let router = router_with(gateway.clone(), secret());

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json, provider_body);
}

#[tokio::test]
async fn provider_status_codes_are_mirrored() {
    for status in [StatusCode::UNAUTHORIZED, StatusCode::SERVICE_UNAVAILABLE] {
        let gateway = FakeGateway::replying(status, json!({"error": "invalid_client"}));
        let router = router_with(gateway, secret());
        let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;
        assert_eq!(resp.status, status);
        assert_eq!(resp.json, json!({"error": "invalid_client"}));
    }
}

#[tokio::test]
async fn missing_secret_fails_every_request_without_provider_call() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let router = router_with(gateway.clone(), None);

    for body in [Some(sample_body("abc123")), Some(json!({})), None] {
        let resp = send(&router, Method::POST, "/token", body).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.json["error"], "Server configuration error");
        assert_eq!(resp.json["error_code"], "RELAY_SECRET_MISSING");
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn missing_secret_wins_over_oversized_body() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let router = router_with(gateway.clone(), None);

    let resp = send_bytes(
        &router,
        Method::POST,
        "/token",
        Some(vec![b'a'; OVERSIZED_BODY_BYTES]),
        &[],
    )
    .await;

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json["error"], "Server configuration error");
    assert_eq!(resp.json["error_code"], "RELAY_SECRET_MISSING");
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn oversized_body_is_a_client_error_without_provider_call() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let router = router_with(gateway.clone(), secret());

    let resp = send_bytes(
        &router,
        Method::POST,
        "/token",
        Some(vec![b'a'; OVERSIZED_BODY_BYTES]),
        &[],
    )
    .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json["error_code"], "RELAY_INVALID_REQUEST");
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn options_preflight_succeeds_without_provider_call() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({}));
    let router = router_with(gateway.clone(), secret());

    let bare = send(&router, Method::OPTIONS, "/token", None).await;
    assert_eq!(bare.status, StatusCode::OK);

    let cors = send_with_headers(
        &router,
        Method::OPTIONS,
        "/token",
        None,
        &[
            ("origin", "http://localhost:8081"),
            ("access-control-request-method", "POST"),
            ("access-control-request-headers", "content-type"),
        ],
    )
    .await;
    assert!(cors.status.is_success());
    assert_eq!(
        cors.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn other_methods_are_rejected_without_provider_call() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({}));
    let router = router_with(gateway.clone(), secret());

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let resp = send(&router, method, "/token", None).await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.json["error"], "Method not allowed");
        assert_eq!(
            resp.headers.get(header::ALLOW).and_then(|v| v.to_str().ok()),
            Some("POST, OPTIONS")
        );
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn missing_fields_are_client_errors_without_provider_call() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({}));
    let router = router_with(gateway.clone(), secret());

    let mut body = sample_body("abc123");
    body.as_object_mut().expect("object").remove("redirect_uri");
    let resp = send(&router, Method::POST, "/token", Some(body)).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json["error"], "invalid_request");
    assert_eq!(resp.json["error_description"], "missing required field: redirect_uri");
    assert_eq!(resp.json["error_code"], "RELAY_INVALID_REQUEST");

    let resp = send(&router, Method::POST, "/token", Some(json!("abc123"))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(!resp.raw.contains("abc123"));

    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn transport_failure_is_generic_and_leaks_nothing() {
    let gateway = FakeGateway::new(FakeMode::TransportError);
    let router = router_with(gateway.clone(), secret());

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json["error"], "Internal server error");
    assert!(!resp.raw.contains("abc123"));
    assert!(!resp.raw.contains(SECRET));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn reused_code_never_succeeds_twice() {
    let gateway = FakeGateway::new(FakeMode::SingleUseCodes);
    let router = router_with(gateway.clone(), secret());

    let first = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;
    let second = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.json["error"], "invalid_grant");
    assert_eq!(gateway.calls(), 2);
}

#[tokio::test]
async fn api_alias_behaves_like_token_route() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let router = router_with(gateway.clone(), secret());

    let resp = send(&router, Method::POST, "/api/token", Some(sample_body("abc123"))).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = send(&router, Method::GET, "/api/token", None).await;
    assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn strict_schema_turns_malformed_success_into_generic_error() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({"access_token": "tok1"}));
    let state = RelayState::new(gateway.clone(), secret()).with_strict_response_schema(true);
    let router = build_router(state);

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json["error_code"], "GW_UPSTREAM_SCHEMA_MISMATCH");
}

#[tokio::test]
async fn strict_schema_still_passes_rejections_through() {
    let gateway = FakeGateway::replying(StatusCode::BAD_REQUEST, json!({"error": "invalid_grant"}));
    let state = RelayState::new(gateway, secret()).with_strict_response_schema(true);
    let router = build_router(state);

    let resp = send(&router, Method::POST, "/token", Some(sample_body("abc123"))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json, json!({"error": "invalid_grant"}));
}

#[tokio::test]
async fn health_reports_secret_presence_only() {
    let gateway = FakeGateway::replying(StatusCode::OK, json!({}));
    let router = router_with(gateway, secret());

    let resp = send(&router, Method::GET, "/health", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["status"], "ok");
    assert_eq!(resp.json["secret_configured"], true);
    assert!(!resp.raw.contains(SECRET));
}
