//! Usage: OAuth token endpoint client (authorization_code grant) and provider payload helpers.

use crate::gateway::error_code::RelayErrorCode;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::{code_prefix, mask_token, ClientSecret};
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Public fields the mobile client sends to the relay.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenExchangeRequest {
    pub grant_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub code: String,
}

impl fmt::Debug for TokenExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenExchangeRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("code", &code_prefix(&self.code))
            .finish()
    }
}

/// Body sent to the provider: the four public fields plus the injected secret.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ProviderTokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub code: String,
}

impl ProviderTokenRequest {
    pub fn new(request: &TokenExchangeRequest, secret: &ClientSecret) -> Self {
        Self {
            grant_type: request.grant_type.clone(),
            client_id: request.client_id.clone(),
            client_secret: secret.expose().to_string(),
            redirect_uri: request.redirect_uri.clone(),
            code: request.code.clone(),
        }
    }
}

impl fmt::Debug for ProviderTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("code", &code_prefix(&self.code))
            .finish()
    }
}

/// Provider answer: status, the body bytes as received, and their parsed form.
///
/// `raw` is what the relay sends back; `body` is only inspected (logs, strict schema).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Bytes,
}

impl ProviderReply {
    pub fn from_json(status: StatusCode, body: Value) -> Self {
        let raw = Bytes::from(serde_json::to_vec(&body).unwrap_or_default());
        Self { status, body, raw }
    }
}

/// Successful token payload (`access_token`, `token_type`, `expires_in`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Outbound capability used by the relay: one POST to the provider token endpoint.
pub trait TokenGateway: Send + Sync {
    fn exchange<'a>(
        &'a self,
        request: &'a ProviderTokenRequest,
    ) -> BoxFuture<'a, AppResult<ProviderReply>>;
}

pub struct HttpTokenGateway {
    client: reqwest::Client,
    token_url: String,
}

impl HttpTokenGateway {
    pub fn new(token_url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("anilist-token-relay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                format!(
                    "{}: failed to build http client: {e}",
                    RelayErrorCode::HttpClientInit.as_str()
                )
            })?;
        Ok(Self::with_client(client, token_url))
    }

    pub fn with_client(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into().trim().to_string(),
        }
    }
}

impl TokenGateway for HttpTokenGateway {
    fn exchange<'a>(
        &'a self,
        request: &'a ProviderTokenRequest,
    ) -> BoxFuture<'a, AppResult<ProviderReply>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.token_url.as_str())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    AppError::new(
                        classify_reqwest_error(&e).as_str(),
                        format!("oauth token request failed: {}", e.without_url()),
                    )
                })?;

            let status = response.status();
            let raw = response.bytes().await.map_err(|e| {
                AppError::new(
                    RelayErrorCode::UpstreamBodyReadError.as_str(),
                    format!("oauth token response read failed: {}", e.without_url()),
                )
            })?;

            let body: Value = serde_json::from_slice(&raw).map_err(|e| {
                AppError::new(
                    RelayErrorCode::UpstreamMalformedBody.as_str(),
                    format!(
                        "oauth token response is not json (status={}): {e}",
                        status.as_u16()
                    ),
                )
            })?;

            Ok(ProviderReply { status, body, raw })
        })
    }
}

pub(crate) fn classify_reqwest_error(err: &reqwest::Error) -> RelayErrorCode {
    if err.is_timeout() {
        return RelayErrorCode::UpstreamTimeout;
    }
    if err.is_connect() {
        return RelayErrorCode::UpstreamConnectFailed;
    }
    RelayErrorCode::UpstreamRequestFailed
}

/// Strict shape check for a successful token payload.
pub(crate) fn validate_token_payload(body: &Value) -> Result<TokenSet, String> {
    let access_token = body
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "missing access_token".to_string())?;
    let token_type = body
        .get("token_type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing token_type".to_string())?;
    let expires_in = body
        .get("expires_in")
        .and_then(Value::as_i64)
        .ok_or_else(|| "missing integer expires_in".to_string())?;

    Ok(TokenSet {
        access_token: access_token.to_string(),
        token_type: token_type.to_string(),
        expires_in,
    })
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token")
        || key_lc.contains("secret")
        || key_lc == "code"
        || key_lc == "authorization"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

/// Log-safe rendering of a provider body: sensitive fields masked, capped at 500 chars.
pub(crate) fn sanitize_oauth_error_body_snippet(body: &Value) -> String {
    let mut value = body.clone();
    redact_sensitive_json_fields(&mut value);
    serde_json::to_string(&value)
        .unwrap_or_default()
        .chars()
        .take(500)
        .collect()
}

/// `(error_code, error_description)` from standard or nested provider error payloads.
pub(crate) fn parse_oauth_error_details(value: &Value) -> (Option<String>, Option<String>) {
    let mut code = value
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let mut message = value
        .get("error_description")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            if code.is_none() {
                code = Some(err_str.trim().to_string());
            }
        } else if let Some(err_obj) = error_value.as_object() {
            if code.is_none() {
                code = err_obj
                    .get("code")
                    .and_then(Value::as_str)
                    .or_else(|| err_obj.get("type").and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}
