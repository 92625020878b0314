//! Usage: Client half of the login flow (authorize url, redirect capture, relay call).

pub(crate) mod authorize;
pub(crate) mod callback;
pub(crate) mod relay_client;
