//! Usage: Relay settings (schema, TOML file + environment layering, validation).

use crate::gateway::listen;
use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:3001";
pub const DEFAULT_RELAY_PORT: u16 = 3001;
pub const DEFAULT_TOKEN_URL: &str = "https://anilist.co/api/v2/oauth/token";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://anilist.co/api/v2/oauth/authorize";
pub const DEFAULT_CLIENT_ID: &str = "29214";
pub const DEFAULT_REDIRECT_URI: &str = "myanilistapp://auth";
pub const DEFAULT_CLIENT_SECRET_ENV: &str = "ANILIST_CLIENT_SECRET";
const DEFAULT_LOG_FILTER: &str = "info";

const ENV_LISTEN: &str = "ANILIST_RELAY_LISTEN";
const ENV_TOKEN_URL: &str = "ANILIST_RELAY_TOKEN_URL";
const ENV_AUTHORIZE_URL: &str = "ANILIST_RELAY_AUTHORIZE_URL";
const ENV_CLIENT_ID: &str = "ANILIST_RELAY_CLIENT_ID";
const ENV_REDIRECT_URI: &str = "ANILIST_RELAY_REDIRECT_URI";
const ENV_STRICT_SCHEMA: &str = "ANILIST_RELAY_STRICT_SCHEMA";
const ENV_LOG_DIR: &str = "ANILIST_RELAY_LOG_DIR";
const ENV_LOG_FILTER: &str = "ANILIST_RELAY_LOG_FILTER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    // host or host:port; port falls back to DEFAULT_RELAY_PORT.
    pub listen_address: String,
    pub token_url: String,
    pub authorize_url: String,
    // Public app registration shared by the mobile client and the provider.
    pub client_id: String,
    pub redirect_uri: String,
    // Name of the env var holding the secret; the secret itself never lives in settings.
    pub client_secret_env: String,
    pub strict_response_schema: bool,
    pub log_dir: Option<String>,
    pub log_filter: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            client_secret_env: DEFAULT_CLIENT_SECRET_ENV.to_string(),
            strict_response_schema: false,
            log_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RelaySettings {
    /// Defaults, then the optional TOML file, then `ANILIST_RELAY_*` env overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut settings = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        settings.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn read_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            format!(
                "CONFIG_ERROR: failed to read settings file {}: {e}",
                path.display()
            )
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> AppResult<Self> {
        Ok(toml::from_str::<Self>(raw)
            .map_err(|e| format!("CONFIG_ERROR: invalid settings toml: {e}"))?)
    }

    pub(crate) fn apply_env_with<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = non_empty(ENV_LISTEN) {
            self.listen_address = v;
        }
        if let Some(v) = non_empty(ENV_TOKEN_URL) {
            self.token_url = v;
        }
        if let Some(v) = non_empty(ENV_AUTHORIZE_URL) {
            self.authorize_url = v;
        }
        if let Some(v) = non_empty(ENV_CLIENT_ID) {
            self.client_id = v;
        }
        if let Some(v) = non_empty(ENV_REDIRECT_URI) {
            self.redirect_uri = v;
        }
        if let Some(v) = non_empty(ENV_STRICT_SCHEMA) {
            self.strict_response_schema = parse_bool_flag(&v).ok_or_else(|| {
                format!("CONFIG_ERROR: {ENV_STRICT_SCHEMA} must be a boolean, got {v:?}")
            })?;
        }
        if let Some(v) = non_empty(ENV_LOG_DIR) {
            self.log_dir = Some(v);
        }
        if let Some(v) = non_empty(ENV_LOG_FILTER) {
            self.log_filter = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_http_url("token_url", &self.token_url)?;
        validate_http_url("authorize_url", &self.authorize_url)?;

        if self.client_id.trim().is_empty() {
            return Err("CONFIG_ERROR: client_id must not be empty".into());
        }
        let redirect = self.redirect_uri.trim();
        if redirect.is_empty() {
            return Err("CONFIG_ERROR: redirect_uri must not be empty".into());
        }
        reqwest::Url::parse(redirect)
            .map_err(|e| format!("CONFIG_ERROR: redirect_uri is not an absolute uri: {e}"))?;
        if self.client_secret_env.trim().is_empty() {
            return Err("CONFIG_ERROR: client_secret_env must name an environment variable".into());
        }

        listen::parse_listen_address(&self.listen_address)
            .map_err(|e| format!("CONFIG_ERROR: invalid listen_address: {e}"))?;
        Ok(())
    }
}

fn validate_http_url(field: &str, raw: &str) -> AppResult<()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(format!("CONFIG_ERROR: {field} must not be empty").into());
    }
    let url = reqwest::Url::parse(raw)
        .map_err(|e| format!("CONFIG_ERROR: {field} is not a valid url: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("CONFIG_ERROR: {field} must use http or https").into());
    }
    Ok(())
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
