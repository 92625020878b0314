//! Usage: Centralized relay error-code enum for stable classification/mapping.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RelayErrorCode {
    SecretMissing,
    InvalidRequest,
    MethodNotAllowed,
    UpstreamTimeout,
    UpstreamConnectFailed,
    UpstreamRequestFailed,
    UpstreamBodyReadError,
    UpstreamMalformedBody,
    UpstreamSchemaMismatch,
    HttpClientInit,
    PortInUse,
    InternalError,
}

impl RelayErrorCode {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::SecretMissing => "RELAY_SECRET_MISSING",
            Self::InvalidRequest => "RELAY_INVALID_REQUEST",
            Self::MethodNotAllowed => "RELAY_METHOD_NOT_ALLOWED",
            Self::UpstreamTimeout => "GW_UPSTREAM_TIMEOUT",
            Self::UpstreamConnectFailed => "GW_UPSTREAM_CONNECT_FAILED",
            Self::UpstreamRequestFailed => "GW_UPSTREAM_REQUEST_FAILED",
            Self::UpstreamBodyReadError => "GW_UPSTREAM_BODY_READ_ERROR",
            Self::UpstreamMalformedBody => "GW_UPSTREAM_MALFORMED_BODY",
            Self::UpstreamSchemaMismatch => "GW_UPSTREAM_SCHEMA_MISMATCH",
            Self::HttpClientInit => "GW_HTTP_CLIENT_INIT",
            Self::PortInUse => "GW_PORT_IN_USE",
            Self::InternalError => "GW_INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RelayErrorCode;

    #[test]
    fn codes_are_upper_snake_case() {
        let all = [
            RelayErrorCode::SecretMissing,
            RelayErrorCode::InvalidRequest,
            RelayErrorCode::MethodNotAllowed,
            RelayErrorCode::UpstreamTimeout,
            RelayErrorCode::UpstreamConnectFailed,
            RelayErrorCode::UpstreamRequestFailed,
            RelayErrorCode::UpstreamBodyReadError,
            RelayErrorCode::UpstreamMalformedBody,
            RelayErrorCode::UpstreamSchemaMismatch,
            RelayErrorCode::HttpClientInit,
            RelayErrorCode::PortInUse,
            RelayErrorCode::InternalError,
        ];
        for code in all {
            let s = code.as_str();
            assert!(s
                .chars()
                .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_'));
        }
    }
}
