//! Usage: Mobile-side call into the relay (`POST /token`) and token payload decoding.

use reqwest::header::ACCEPT;

use super::callback::RedirectOutcome;
use crate::gateway::oauth::token_exchange::{
    parse_oauth_error_details, TokenExchangeRequest, TokenSet,
};
use crate::infra::settings::RelaySettings;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::code_prefix;

const EXCHANGE_FAILED_CODE: &str = "AUTH_EXCHANGE_FAILED";

pub struct RelayClient {
    client: reqwest::Client,
    relay_token_url: String,
    client_id: String,
    redirect_uri: String,
}

impl RelayClient {
    /// `relay_token_url` is the full relay endpoint, e.g. `http://localhost:3001/api/token`.
    pub fn new(relay_token_url: impl Into<String>, settings: &RelaySettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("anilist-mobile/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("GW_HTTP_CLIENT_INIT: failed to build http client: {e}"))?;
        Ok(Self {
            client,
            relay_token_url: relay_token_url.into().trim().to_string(),
            client_id: settings.client_id.trim().to_string(),
            redirect_uri: settings.redirect_uri.trim().to_string(),
        })
    }

    /// Exactly one relay call per code; a rejected code is never retried.
    pub async fn exchange_code(&self, code: &str) -> AppResult<TokenSet> {
        let code = code.trim();
        if code.is_empty() {
            return Err("SEC_INVALID_INPUT: authorization code is empty".into());
        }

        let request = TokenExchangeRequest {
            grant_type: "authorization_code".to_string(),
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            code: code.to_string(),
        };
        tracing::info!(code = %code_prefix(code), "exchanging authorization code via relay");

        let response = self
            .client
            .post(self.relay_token_url.as_str())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    EXCHANGE_FAILED_CODE,
                    format!("relay request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::new(
                EXCHANGE_FAILED_CODE,
                format!("relay response read failed: {}", e.without_url()),
            )
        })?;

        if !status.is_success() {
            let (error_code, error_message) = serde_json::from_str::<serde_json::Value>(&body)
                .map(|value| parse_oauth_error_details(&value))
                .unwrap_or((None, None));
            let mut msg = format!("relay returned status={}", status.as_u16());
            if let Some(code) = error_code {
                msg.push_str(" error=");
                msg.push_str(code.as_str());
            }
            if let Some(detail) = error_message {
                msg.push_str(" message=");
                msg.push_str(detail.chars().take(240).collect::<String>().as_str());
            }
            tracing::warn!(status = status.as_u16(), "token exchange via relay failed");
            return Err(AppError::new(EXCHANGE_FAILED_CODE, msg));
        }

        let token: TokenSet = serde_json::from_str(&body).map_err(|e| {
            AppError::new(
                EXCHANGE_FAILED_CODE,
                format!("token response json invalid: {e}"),
            )
        })?;
        tracing::info!("token exchange via relay succeeded");
        Ok(token)
    }

    /// Finish a login attempt: exchange a captured code, surface a denial without calling out.
    pub async fn complete(&self, outcome: RedirectOutcome) -> AppResult<TokenSet> {
        match outcome {
            RedirectOutcome::Code(code) => self.exchange_code(&code).await,
            RedirectOutcome::Denied {
                error,
                error_description,
            } => {
                let mut msg = format!("authorization denied: {error}");
                if let Some(detail) = error_description {
                    msg.push_str(" (");
                    msg.push_str(&detail);
                    msg.push(')');
                }
                Err(AppError::new("AUTH_DENIED", msg))
            }
        }
    }
}
