use anilist_token_relay_lib::{
    init_logging, relay_state_from_settings, run, AppResult, ClientSecret, RelaySettings,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "anilist-token-relay")]
#[command(about = "OAuth authorization-code exchange relay for the AniList mobile client")]
struct Args {
    /// Path to a TOML settings file
    #[arg(long, env = "ANILIST_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (host or host:port), overrides settings
    #[arg(long)]
    listen: Option<String>,

    /// Provider token endpoint, overrides settings
    #[arg(long)]
    token_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_settings(args: &Args) -> AppResult<RelaySettings> {
    let mut settings = RelaySettings::load(args.config.as_deref())?;
    if let Some(listen) = args.listen.as_deref() {
        settings.listen_address = listen.to_string();
    }
    if let Some(token_url) = args.token_url.as_deref() {
        settings.token_url = token_url.to_string();
    }
    if args.verbose {
        settings.log_filter = "debug".to_string();
    }
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(&settings.log_filter, settings.log_dir.as_deref().map(Path::new));

    // Read once; the value lives only in RelayState from here on.
    let secret = ClientSecret::from_env(&settings.client_secret_env);

    let state = match relay_state_from_settings(&settings, secret) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error_code = %err.code(), "{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&settings, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error_code = %err.code(), "{err}");
            ExitCode::FAILURE
        }
    }
}
