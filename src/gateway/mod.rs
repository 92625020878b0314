//! Usage: HTTP relay surface (router, handlers, listener lifecycle, provider gateway).

pub(crate) mod error_code;
pub(crate) mod errors;
pub(crate) mod listen;
pub(crate) mod manager;
pub(crate) mod oauth;
pub(crate) mod relay;
pub(crate) mod routes;
