#![allow(dead_code)]

use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use anilist_token_relay_lib::{
    build_router, AppError, AppResult, BoxFuture, ClientSecret, ProviderReply,
    ProviderTokenRequest, RelayState, TokenGateway,
};
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "S3CR3T";

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Serializes env mutation across tests in one binary and restores values on drop.
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            _lock: env_lock(),
            saved: Vec::new(),
        }
    }

    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    pub fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    pub fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

pub enum FakeMode {
    Reply(StatusCode, Value),
    /// Each code succeeds once, then answers `invalid_grant` like the provider does.
    SingleUseCodes,
    TransportError,
}

/// In-memory stand-in for the provider token endpoint.
pub struct FakeGateway {
    mode: FakeMode,
    calls: AtomicUsize,
    seen: Mutex<Vec<ProviderTokenRequest>>,
    consumed: Mutex<HashSet<String>>,
}

impl FakeGateway {
    pub fn new(mode: FakeMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            consumed: Mutex::new(HashSet::new()),
        })
    }

    pub fn replying(status: StatusCode, body: Value) -> Arc<Self> {
        Self::new(FakeMode::Reply(status, body))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<ProviderTokenRequest> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl TokenGateway for FakeGateway {
    fn exchange<'a>(
        &'a self,
        request: &'a ProviderTokenRequest,
    ) -> BoxFuture<'a, AppResult<ProviderReply>> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().expect("seen lock").push(request.clone());
            match &self.mode {
                FakeMode::Reply(status, body) => {
                    Ok(ProviderReply::from_json(*status, body.clone()))
                }
                FakeMode::SingleUseCodes => {
                    let fresh = self
                        .consumed
                        .lock()
                        .expect("consumed lock")
                        .insert(request.code.clone());
                    if fresh {
                        Ok(ProviderReply::from_json(
                            StatusCode::OK,
                            json!({
                                "access_token": format!("tok{n}"),
                                "token_type": "Bearer",
                                "expires_in": 3600
                            }),
                        ))
                    } else {
                        Ok(ProviderReply::from_json(
                            StatusCode::BAD_REQUEST,
                            json!({
                                "error": "invalid_grant",
                                "error_description": "Invalid authorization code"
                            }),
                        ))
                    }
                }
                FakeMode::TransportError => Err(AppError::new(
                    "GW_UPSTREAM_CONNECT_FAILED",
                    "oauth token request failed: connection refused",
                )),
            }
        })
    }
}

pub fn secret() -> Option<ClientSecret> {
    ClientSecret::new(SECRET)
}

pub fn router_with(gateway: Arc<FakeGateway>, secret: Option<ClientSecret>) -> Router {
    build_router(RelayState::new(gateway, secret))
}

pub fn sample_body(code: &str) -> Value {
    json!({
        "grant_type": "authorization_code",
        "client_id": "29214",
        "redirect_uri": "myanilistapp://auth",
        "code": code
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: String,
    pub json: Value,
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    send_with_headers(router, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let body = body.map(|body| serde_json::to_vec(&body).expect("encode body"));
    send_bytes(router, method, uri, body, headers).await
}

/// Send an arbitrary body (`None` sends an empty body without a content type).
pub async fn send_bytes(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Vec<u8>>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let raw = String::from_utf8_lossy(&bytes).to_string();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        raw,
        json,
    }
}
