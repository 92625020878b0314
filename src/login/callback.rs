//! Usage: Redirect interception for the mobile login flow (code/error extraction, state check,
//! single-shot completion).

use reqwest::Url;
use std::fmt;
use tokio::sync::oneshot;

use super::authorize::{build_authorize_url, AuthorizeUrl};
use crate::infra::settings::RelaySettings;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::{code_prefix, constant_time_eq};

const STATE_ERROR_CODE: &str = "SEC_STATE_MISMATCH";
const INVALID_INPUT_CODE: &str = "SEC_INVALID_INPUT";

#[derive(Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Code(String),
    Denied {
        error: String,
        error_description: Option<String>,
    },
}

impl fmt::Debug for RedirectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => f.debug_tuple("Code").field(&code_prefix(code)).finish(),
            Self::Denied {
                error,
                error_description,
            } => f
                .debug_struct("Denied")
                .field("error", error)
                .field("error_description", error_description)
                .finish(),
        }
    }
}

fn normalized_path(url: &Url) -> &str {
    url.path().trim_end_matches('/')
}

/// Whether `candidate` points at the registered redirect uri (query ignored).
pub fn is_redirect_target(candidate: &str, redirect_uri: &str) -> bool {
    let (Ok(candidate), Ok(expected)) =
        (Url::parse(candidate.trim()), Url::parse(redirect_uri.trim()))
    else {
        return false;
    };
    candidate.scheme() == expected.scheme()
        && candidate.host_str() == expected.host_str()
        && candidate.port() == expected.port()
        && normalized_path(&candidate) == normalized_path(&expected)
}

pub fn parse_redirect(
    url: &str,
    redirect_uri: &str,
    expected_state: &str,
) -> AppResult<RedirectOutcome> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AppError::new(INVALID_INPUT_CODE, format!("invalid redirect url: {e}")))?;
    if !is_redirect_target(url, redirect_uri) {
        return Err(AppError::new(
            INVALID_INPUT_CODE,
            "redirect does not target the configured redirect_uri",
        ));
    }

    let mut code: Option<String> = None;
    let mut state: Option<String> = None;
    let mut error: Option<String> = None;
    let mut error_description: Option<String> = None;

    for (key, value) in parsed.query_pairs() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            "error_description" => error_description = Some(value.to_string()),
            _ => {}
        }
    }

    if code.is_none() && error.is_none() {
        return Err(AppError::new(INVALID_INPUT_CODE, "redirect missing code/error"));
    }

    let state = state.ok_or_else(|| AppError::new(STATE_ERROR_CODE, "redirect missing state"))?;
    if !constant_time_eq(state.as_bytes(), expected_state.as_bytes()) {
        return Err(AppError::new(STATE_ERROR_CODE, "redirect state mismatch"));
    }

    if let Some(error) = error {
        return Ok(RedirectOutcome::Denied {
            error,
            error_description,
        });
    }
    match code {
        Some(code) => Ok(RedirectOutcome::Code(code)),
        None => Err(AppError::new(INVALID_INPUT_CODE, "redirect missing code")),
    }
}

/// One login attempt: a fresh authorize url whose redirect completes exactly once.
#[derive(Debug)]
pub struct LoginAttempt {
    authorize: AuthorizeUrl,
    redirect_uri: String,
    completion: Option<oneshot::Sender<RedirectOutcome>>,
}

impl LoginAttempt {
    pub fn begin(settings: &RelaySettings) -> AppResult<(Self, oneshot::Receiver<RedirectOutcome>)> {
        let authorize = build_authorize_url(settings)?;
        let (tx, rx) = oneshot::channel();
        Ok((
            Self {
                authorize,
                redirect_uri: settings.redirect_uri.trim().to_string(),
                completion: Some(tx),
            },
            rx,
        ))
    }

    pub fn authorize_url(&self) -> &str {
        &self.authorize.url
    }

    pub fn state(&self) -> &str {
        &self.authorize.state
    }

    pub fn is_completed(&self) -> bool {
        self.completion.is_none()
    }

    /// Feed every url the embedded browser navigates to.
    ///
    /// Returns `Ok(false)` for ordinary navigation and `Ok(true)` once the redirect has been
    /// captured. A malformed or forged redirect still completes the attempt, as `Denied`.
    pub fn handle_navigation(&mut self, url: &str) -> AppResult<bool> {
        if !is_redirect_target(url, &self.redirect_uri) {
            return Ok(false);
        }
        let Some(completion) = self.completion.take() else {
            return Err(AppError::new(
                "LOGIN_ALREADY_COMPLETED",
                "login attempt already received its redirect",
            ));
        };

        let outcome = match parse_redirect(url, &self.redirect_uri, &self.authorize.state) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    error_code = %err.code(),
                    "login redirect rejected: {}",
                    err.message()
                );
                let error = if err.code() == STATE_ERROR_CODE {
                    "state_mismatch"
                } else {
                    "invalid_callback"
                };
                RedirectOutcome::Denied {
                    error: error.to_string(),
                    error_description: Some(err.message().to_string()),
                }
            }
        };

        tracing::debug!(outcome = ?outcome, "login redirect captured");
        if completion.send(outcome).is_err() {
            tracing::debug!("login attempt receiver dropped before completion");
        }
        Ok(true)
    }
}
