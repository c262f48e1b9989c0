// Application server configuration and setup

use axum::{
    Router,
    middleware::from_fn,
    extract::DefaultBodyLimit,
};
use tower::ServiceBuilder;
use tokio::{signal, net::TcpListener};
use listenfd::ListenFd;
use anyhow::Result;

use crate::api::plaid::routes::plaid_routes;
use crate::config::{environment::EnvironmentVariables, state::AppState};
use crate::utils::response_handler::response_logger;

/// Creates and configures the application router with all middleware layers.
///
/// No timeout layer: the relay waits on the upstream for as long as it takes.
pub fn create_app(state: AppState) -> Router {
    let max_body: usize = state.environment.max_request_body_size;

    Router::new()
        .merge(plaid_routes())
        // Add new routes here
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(response_logger))
                .layer(DefaultBodyLimit::max(max_body))
        )
        .with_state(state)
}

/// Sets up the TCP listener from environment or binds to new address
pub async fn setup_listener(env: &EnvironmentVariables) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => {
            let addr: String = format!("{}:{}", env.host, env.port);
            TcpListener::bind(&addr).await?
        }
    };

    Ok(listener)
}

/// Handles graceful shutdown signals (Ctrl+C and TERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate: std::future::Pending<()> = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutting down via Ctrl+C"),
        _ = terminate => tracing::info!("Shutting down via TERM signal"),
    }
}
