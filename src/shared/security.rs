//! Usage: Security-sensitive helpers (client secret holder, log redaction, constant-time equality).

use std::fmt;
use subtle::ConstantTimeEq;

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;
const CODE_PREFIX_MAX_LEN: usize = 6;

/// The confidential OAuth client secret.
///
/// Not `Serialize`, and `Debug` never prints the value. Only the provider request builder
/// reads it back via `expose`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Returns `None` when the value is empty after trimming.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Read the secret from the named environment variable.
    pub fn from_env(var_name: &str) -> Option<Self> {
        std::env::var(var_name).ok().and_then(Self::new)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let len = trimmed.len();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN || !trimmed.is_ascii() {
        return "*".repeat(len.min(8));
    }

    let prefix = &trimmed[..TOKEN_MASK_PREFIX_LEN];
    let suffix = &trimmed[len - TOKEN_MASK_SUFFIX_LEN..];
    format!("{prefix}...{suffix}")
}

/// Truncated authorization-code prefix for log correlation.
///
/// Never reveals more than half of the code, capped at six characters.
pub(crate) fn code_prefix(code: &str) -> String {
    let trimmed = code.trim();
    let total = trimmed.chars().count();
    if total == 0 {
        return String::new();
    }
    let keep = (total / 2).min(CODE_PREFIX_MAX_LEN);
    let prefix: String = trimmed.chars().take(keep).collect();
    format!("{prefix}...")
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
