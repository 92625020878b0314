//! Usage: Relay error taxonomy + standardized JSON error responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::error_code::RelayErrorCode;
use crate::shared::error::AppError;

pub(crate) const ALLOWED_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Client secret absent: an operator fault, never caused by client input.
    #[error("client secret is not configured")]
    Configuration,
    #[error("invalid token request: {0}")]
    ClientRequest(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Network failure, unreadable or malformed provider response.
    #[error(transparent)]
    Transport(AppError),
}

#[derive(Debug, Serialize)]
struct RelayErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
    error_code: String,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ClientRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Self::Configuration => RelayErrorCode::SecretMissing.as_str(),
            Self::ClientRequest(_) => RelayErrorCode::InvalidRequest.as_str(),
            Self::MethodNotAllowed => RelayErrorCode::MethodNotAllowed.as_str(),
            Self::Transport(err) => err.code(),
        }
    }

    fn body(&self) -> RelayErrorResponse {
        let (error, error_description) = match self {
            Self::Configuration => ("Server configuration error", None),
            Self::ClientRequest(detail) => ("invalid_request", Some(detail.clone())),
            Self::MethodNotAllowed => ("Method not allowed", None),
            // Transport detail stays in the logs; it may mention upstream internals.
            Self::Transport(_) => ("Internal server error", None),
        };
        RelayErrorResponse {
            error,
            error_description,
            error_code: self.error_code().to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if matches!(self, Self::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}
