// Start of file: src/main.rs

use axum::{Router, serve};
use tokio::net::TcpListener;

use plaid_relay::config::{environment::EnvironmentVariables, state::AppState};
use plaid_relay::core::{logging::init_tracing, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // set up logging
    init_tracing();

    let environment: EnvironmentVariables = EnvironmentVariables::load()?;
    let listener: TcpListener = server::setup_listener(&environment).await?;
    let state: AppState = AppState::new(environment).await?;

    let app: Router = server::create_app(state);

    tracing::info!("Server listening on: {}", listener.local_addr()?);

    serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    Ok(())
}

// End of file: src/main.rs
