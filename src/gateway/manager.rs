use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error_code::RelayErrorCode;
use super::listen;
use super::oauth::token_exchange::HttpTokenGateway;
use super::relay::RelayState;
use super::routes::build_router;
use crate::infra::settings::RelaySettings;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::ClientSecret;

/// A relay bound to a socket and serving in a background task.
pub struct RunningRelay {
    local_addr: SocketAddr,
    base_url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<AppResult<()>>,
}

impl RunningRelay {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop accepting connections, let in-flight requests finish, then join the task.
    pub async fn shutdown(self) -> AppResult<()> {
        let _ = self.shutdown.send(());
        self.task.await.map_err(|e| {
            AppError::new(
                RelayErrorCode::InternalError.as_str(),
                format!("relay task join failed: {e}"),
            )
        })?
    }
}

/// Build handler state from settings plus the secret loaded at startup.
pub fn relay_state_from_settings(
    settings: &RelaySettings,
    secret: Option<ClientSecret>,
) -> AppResult<RelayState> {
    let gateway = HttpTokenGateway::new(settings.token_url.as_str())?;
    Ok(RelayState::new(Arc::new(gateway), secret)
        .with_strict_response_schema(settings.strict_response_schema))
}

pub async fn bind(listen_address: &str) -> AppResult<(TcpListener, String)> {
    let parsed = listen::parse_listen_address(listen_address)
        .map_err(|e| format!("CONFIG_ERROR: invalid listen_address: {e}"))?;
    let bind_addr = listen::format_host_port(&parsed.host, parsed.port);
    let listener = TcpListener::bind((parsed.host.as_str(), parsed.port))
        .await
        .map_err(|e| {
            AppError::new(
                RelayErrorCode::PortInUse.as_str(),
                format!("failed to bind {bind_addr}: {e}"),
            )
        })?;
    Ok((listener, parsed.host))
}

fn base_url_for(bind_host: &str, local_addr: SocketAddr) -> String {
    format!(
        "http://{}",
        listen::format_host_port(listen::display_host(bind_host), local_addr.port())
    )
}

async fn serve_until<F>(listener: TcpListener, state: RelayState, signal: F) -> AppResult<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            AppError::new(
                RelayErrorCode::InternalError.as_str(),
                format!("relay server failed: {e}"),
            )
        })
}

/// Bind and serve in a background task (port 0 picks an ephemeral port).
pub async fn spawn(listen_address: &str, state: RelayState) -> AppResult<RunningRelay> {
    let (listener, bind_host) = bind(listen_address).await?;
    let local_addr = listener.local_addr().map_err(|e| {
        AppError::new(
            RelayErrorCode::InternalError.as_str(),
            format!("failed to read bound address: {e}"),
        )
    })?;
    let base_url = base_url_for(&bind_host, local_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve_until(listener, state, async move {
        let _ = shutdown_rx.await;
    }));

    tracing::info!(listen_addr = %local_addr, base_url = %base_url, "token relay started");
    Ok(RunningRelay {
        local_addr,
        base_url,
        shutdown: shutdown_tx,
        task,
    })
}

/// Serve on the configured address until Ctrl-C / SIGTERM.
pub async fn run(settings: &RelaySettings, state: RelayState) -> AppResult<()> {
    let (listener, bind_host) = bind(&settings.listen_address).await?;
    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(
            listen_addr = %local_addr,
            base_url = %base_url_for(&bind_host, local_addr),
            token_url = %settings.token_url,
            "token relay listening"
        );
    }
    if !state.secret_configured() {
        tracing::warn!(
            env = %settings.client_secret_env,
            "client secret is not configured; every token exchange will fail with a configuration error"
        );
    }

    serve_until(listener, state, shutdown_signal()).await?;
    tracing::info!("token relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
