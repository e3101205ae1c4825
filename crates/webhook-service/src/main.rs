//! Binary entry point for the webhook intake/replay service.
//!
//! This executable:
//! - Loads configuration from files and environment (section 6)
//! - Initializes tracing
//! - Wires adapters, the intake pipeline, and the replay worker (`app::build`)
//! - Serves `POST /webhooks`, `GET /health`, `GET /metrics`
//! - Drives a single grace-period shutdown across the HTTP server and the
//!   replay worker on SIGINT/SIGTERM (spec section 5 "Cancellation")

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webhook_service::http::build_router;
use webhook_service::{app, ServiceConfig, ServiceError, ShutdownHandle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_service=info,webhook_core=info,github_bot_sdk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting webhook-service");

    if let Err(err) = run().await {
        error!(error = %err, "webhook-service exited with an error");
        std::process::exit(exit_code(&err));
    }

    Ok(())
}

async fn run() -> Result<(), ServiceError> {
    let config = ServiceConfig::load()?;
    let application = app::build(&config)?;

    application.state.mark_ready();
    let router = build_router(application.state);

    let addr = SocketAddr::new(config.server.host.parse().map_err(|e| ServiceError::Configuration {
        message: format!("server.host `{}` is not a valid address: {e}", config.server.host),
    })?, config.server.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;
    info!(%addr, "listening");

    let shutdown = ShutdownHandle::new();
    let (worker_shutdown_tx, worker_shutdown_rx) = watch::channel(false);

    let bridge_shutdown = shutdown.clone();
    let bridge = tokio::spawn(async move {
        bridge_shutdown.triggered().await;
        let _ = worker_shutdown_tx.send(true);
    });

    let worker_handle = tokio::spawn(async move { application.worker.run(worker_shutdown_rx).await });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination_signal().await;
        info!("shutdown signal received, draining");
        signal_shutdown.trigger();
    });

    let grace_period = Duration::from_secs(config.server.shutdown_grace_period_seconds);
    let server_shutdown = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_shutdown.triggered().await })
        .await
        .map_err(|e| ServiceError::ServerFailed { message: e.to_string() })?;

    info!("HTTP server stopped accepting connections, waiting for replay worker to drain");
    if tokio::time::timeout(grace_period, worker_handle).await.is_err() {
        error!(grace_period_secs = grace_period.as_secs(), "replay worker did not stop within the grace period");
    }
    let _ = bridge.await;

    info!("webhook-service shutdown complete");
    Ok(())
}

async fn wait_for_termination_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn exit_code(err: &ServiceError) -> i32 {
    match err {
        ServiceError::Configuration { .. } => 1,
        ServiceError::UnsupportedProvider { .. } => 2,
        ServiceError::AdapterInit { .. } => 3,
        ServiceError::BindFailed { .. } => 4,
        ServiceError::ServerFailed { .. } => 5,
        ServiceError::Intake(_) => 6,
    }
}
