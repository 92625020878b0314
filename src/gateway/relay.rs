//! Usage: Token relay endpoint (validate body, inject client secret, pass provider reply through).

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use super::error_code::RelayErrorCode;
use super::errors::RelayError;
use super::oauth::token_exchange::{
    parse_oauth_error_details, sanitize_oauth_error_body_snippet, validate_token_payload,
    ProviderReply, ProviderTokenRequest, TokenExchangeRequest, TokenGateway,
};
use crate::shared::error::AppError;
use crate::shared::security::{code_prefix, ClientSecret};

/// Upper bound on an inbound exchange body.
pub(crate) const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct RelayState {
    pub(crate) gateway: Arc<dyn TokenGateway>,
    pub(crate) secret: Option<Arc<ClientSecret>>,
    pub(crate) strict_response_schema: bool,
}

impl RelayState {
    pub fn new(gateway: Arc<dyn TokenGateway>, secret: Option<ClientSecret>) -> Self {
        Self {
            gateway,
            secret: secret.map(Arc::new),
            strict_response_schema: false,
        }
    }

    pub fn with_strict_response_schema(mut self, enabled: bool) -> Self {
        self.strict_response_schema = enabled;
        self
    }

    pub fn secret_configured(&self) -> bool {
        self.secret.is_some()
    }
}

fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|v| !v.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse and validate the inbound body. Error details name fields, never echo values.
pub(crate) fn parse_exchange_request(body: &[u8]) -> Result<TokenExchangeRequest, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::ClientRequest(
            "request body must be a JSON object".to_string(),
        ));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RelayError::ClientRequest("request body is not valid JSON".to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        RelayError::ClientRequest("request body must be a JSON object".to_string())
    })?;

    let field = |name: &str| {
        object.get(name).and_then(field_as_string).ok_or_else(|| {
            RelayError::ClientRequest(format!("missing required field: {name}"))
        })
    };

    Ok(TokenExchangeRequest {
        grant_type: field("grant_type")?,
        client_id: field("client_id")?,
        redirect_uri: field("redirect_uri")?,
        code: field("code")?,
    })
}

/// Exchange an authorization code through the provider on behalf of a public client.
///
/// Exactly one gateway call per invocation. Any provider status is returned as-is; only
/// transport failures (and, when `strict_response_schema` is set, a malformed success
/// payload) become errors.
pub async fn exchange_code(
    gateway: &dyn TokenGateway,
    secret: &ClientSecret,
    request: &TokenExchangeRequest,
    strict_response_schema: bool,
) -> Result<ProviderReply, RelayError> {
    let code_ref = code_prefix(&request.code);
    tracing::info!(
        client_id = %request.client_id,
        code = %code_ref,
        "token exchange attempted"
    );

    let outbound = ProviderTokenRequest::new(request, secret);
    let reply = match gateway.exchange(&outbound).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!(
                code = %code_ref,
                error_code = %err.code(),
                "token exchange failed: {}",
                err.message()
            );
            return Err(RelayError::Transport(err));
        }
    };

    if !reply.status.is_success() {
        let (provider_error, provider_message) = parse_oauth_error_details(&reply.body);
        tracing::warn!(
            code = %code_ref,
            status = reply.status.as_u16(),
            provider_error = provider_error.as_deref().unwrap_or("-"),
            provider_message = provider_message.as_deref().unwrap_or("-"),
            body = %sanitize_oauth_error_body_snippet(&reply.body),
            "token exchange failed: provider rejected the request"
        );
        return Ok(reply);
    }

    if strict_response_schema {
        if let Err(detail) = validate_token_payload(&reply.body) {
            tracing::error!(
                code = %code_ref,
                status = reply.status.as_u16(),
                "token exchange failed: provider payload does not match schema: {detail}"
            );
            return Err(RelayError::Transport(AppError::new(
                RelayErrorCode::UpstreamSchemaMismatch.as_str(),
                detail,
            )));
        }
    }

    tracing::info!(
        code = %code_ref,
        status = reply.status.as_u16(),
        "token exchange succeeded"
    );
    Ok(reply)
}

pub(crate) async fn exchange_token(State(state): State<RelayState>, body: Body) -> Response {
    // Checked before the body is read, so client input never changes this response.
    let Some(secret) = state.secret.as_deref() else {
        tracing::error!(
            error_code = RelayErrorCode::SecretMissing.as_str(),
            "client secret is not configured; refusing token exchange"
        );
        return RelayError::Configuration.into_response();
    };

    let body = match axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => {
            let err = RelayError::ClientRequest(format!(
                "request body is unreadable or larger than {MAX_REQUEST_BODY_BYTES} bytes"
            ));
            tracing::warn!(error_code = %err.error_code(), "{err}");
            return err.into_response();
        }
    };

    let request = match parse_exchange_request(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error_code = %err.error_code(), "{err}");
            return err.into_response();
        }
    };

    match exchange_code(
        state.gateway.as_ref(),
        secret,
        &request,
        state.strict_response_schema,
    )
    .await
    {
        Ok(reply) => (
            reply.status,
            [(header::CONTENT_TYPE, "application/json")],
            reply.raw,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub(crate) async fn method_not_allowed() -> Response {
    RelayError::MethodNotAllowed.into_response()
}
