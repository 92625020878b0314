//! Usage: Provider authorization URL with a fresh per-attempt `state` value.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::infra::settings::RelaySettings;
use crate::shared::error::AppResult;

const STATE_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeUrl {
    pub url: String,
    pub state: String,
}

pub(crate) fn generate_state() -> String {
    let mut random = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut random);
    URL_SAFE_NO_PAD.encode(random)
}

pub fn build_authorize_url(settings: &RelaySettings) -> AppResult<AuthorizeUrl> {
    let state = generate_state();
    let url = reqwest::Url::parse_with_params(
        settings.authorize_url.trim(),
        &[
            ("client_id", settings.client_id.trim()),
            ("redirect_uri", settings.redirect_uri.trim()),
            ("response_type", "code"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| format!("CONFIG_ERROR: invalid authorize_url: {e}"))?;

    Ok(AuthorizeUrl {
        url: url.into(),
        state,
    })
}
