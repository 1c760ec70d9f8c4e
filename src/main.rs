//! GKE Cluster Operator
//!
//! Main entry point for the operator. Loads configuration, sets up the
//! Kubernetes and GKE clients, and runs the GkeCluster controller.

use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gke_cluster_operator::{
    cloud::GkeClient,
    config::OperatorConfig,
    controllers::{self, Context},
    metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting GKE Cluster Operator");

    let config = OperatorConfig::from_env()?;
    info!(
        project = %config.project,
        endpoint = %config.api_endpoint,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Loaded configuration"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let gke = GkeClient::new(&config.api_endpoint, &config.project, &config.access_token)?;

    let shutdown = CancellationToken::new();
    let context = Arc::new(Context::for_cluster(
        client.clone(),
        Arc::new(gke),
        config.poll_interval,
        shutdown.clone(),
    ));

    let metrics_handle = tokio::spawn(metrics::serve(config.metrics_port, shutdown.clone()));
    info!("Metrics server starting on port {}", config.metrics_port);

    let mut cluster_controller =
        tokio::spawn(controllers::run_gke_cluster_controller(client, context));

    let controller_running = tokio::select! {
        _ = &mut cluster_controller => {
            error!("GkeCluster controller exited unexpectedly");
            false
        }
        _ = metrics_handle => {
            error!("Metrics server exited unexpectedly");
            true
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
            true
        }
    };

    // Cancels in-flight provisioning waits and stops the controller
    shutdown.cancel();

    if controller_running {
        info!("Waiting for in-flight reconciliations to finish");
        if let Err(e) = cluster_controller.await {
            error!(error = %e, "GkeCluster controller task failed");
        }
    }

    info!("GKE Cluster Operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kube=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
