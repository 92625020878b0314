//! Usage: Provider-side OAuth helpers (authorization_code token exchange).

pub(crate) mod token_exchange;
