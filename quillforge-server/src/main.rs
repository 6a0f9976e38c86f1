//! ABOUTME: Binary entrypoint — loads configuration, wires the production stack, and
//! ABOUTME: runs the HTTP API and the background worker side by side until shutdown

use quillforge_server::state::AppState;
use quillforge_server::wiring;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = quillforge_config::Config::load()?;
    let stack = wiring::build_stack(&config).await?;

    match stack.worker.recover_stuck_jobs().await {
        Ok(recovered) if recovered > 0 => info!(recovered, "reconciled stuck jobs from a previous run"),
        Ok(_) => {}
        Err(err) => error!(%err, "failed to recover stuck jobs, continuing anyway"),
    }

    let admin_api_key = std::env::var("QUILLFORGE_ADMIN_API_KEY").ok();
    let state = AppState::new(
        stack.repository.clone() as std::sync::Arc<dyn quillforge_core::traits::repository::Repository>,
        stack.metrics.clone(),
        admin_api_key,
        stack.default_max_iterations,
    );
    let app = quillforge_server::build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "quillforge server listening");

    let worker_handle = {
        let worker = stack.worker.clone();
        tokio::spawn(async move { worker.run().await })
    };
    let shutdown_handle = stack.worker.shutdown_handle();

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_handle.cancel();
    });

    if let Err(err) = server.await {
        error!(%err, "HTTP server exited with an error");
    }
    let _ = worker_handle.await;
    Ok(())
}
