//! AniList OAuth token relay.
//!
//! Holds the confidential client secret server-side and performs the authorization-code
//! exchange for the public mobile client, passing the provider's reply through unchanged.

mod app;
mod gateway;
mod infra;
mod login;
mod shared;

pub use app::logging::init as init_logging;
pub use gateway::errors::RelayError;
pub use gateway::manager::{bind, relay_state_from_settings, run, spawn, RunningRelay};
pub use gateway::oauth::token_exchange::{
    BoxFuture, HttpTokenGateway, ProviderReply, ProviderTokenRequest, TokenExchangeRequest,
    TokenGateway, TokenSet,
};
pub use gateway::relay::{exchange_code, RelayState};
pub use gateway::routes::build_router;
pub use infra::settings::RelaySettings;
pub use login::authorize::{build_authorize_url, AuthorizeUrl};
pub use login::callback::{is_redirect_target, parse_redirect, LoginAttempt, RedirectOutcome};
pub use login::relay_client::RelayClient;
pub use shared::error::{AppError, AppResult};
pub use shared::security::ClientSecret;
