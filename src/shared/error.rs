//! Usage: Unified relay error model (maps internal failures to `CODE: message` strings).

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(':')?;
    let code = maybe_code.trim();
    if code.is_empty() {
        return None;
    }
    let mut chars = code.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AppError::new(code.to_string(), message.to_string());
        }
        AppError::new("INTERNAL_ERROR", value)
    }
}

impl From<&'static str> for AppError {
    fn from(value: &'static str) -> Self {
        AppError::from(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_splits_upper_snake_code() {
        let err = AppError::from("CONFIG_ERROR: token_url must not be empty".to_string());
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert_eq!(err.message(), "token_url must not be empty");
        assert_eq!(err.to_string(), "CONFIG_ERROR: token_url must not be empty");
    }

    #[test]
    fn from_string_without_code_falls_back_to_internal_error() {
        let err = AppError::from("connection reset: peer went away".to_string());
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.message(), "connection reset: peer went away");
    }

    #[test]
    fn from_string_strips_error_prefix() {
        let err = AppError::from("Error: GW_UPSTREAM_TIMEOUT: slow".to_string());
        assert_eq!(err.code(), "GW_UPSTREAM_TIMEOUT");
        assert_eq!(err.message(), "slow");
    }
}
