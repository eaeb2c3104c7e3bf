use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vpc_backend::{BackendClient, RestClient};
use vpc_core::NetworkConfigRegistry;
use vpc_service::{
    GarbageCollector, KubeNetworkInfoLister, LbProviderSelector, Metrics, Stores, VpcService,
};

mod config;
mod namespace_controller;
mod network_config_controller;
mod network_info_controller;

use config::ControllerConfig;
use network_info_controller::Context;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env().context("invalid controller configuration")?;
    init_tracing(config.json_logs);

    info!(cluster = %config.cluster_name, "Starting vpc-controller...");

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    let backend: Arc<dyn BackendClient> = Arc::new(
        RestClient::new(config.rest_config()).context("failed to create backend client")?,
    );

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received, stopping...");
        shutdown.cancel();
    });

    // Controllers start only after the caches reflect the backend
    let stores = Stores::new();
    tokio::time::timeout(
        config.bootstrap_timeout,
        stores.populate(backend.as_ref(), &config.cluster_name, &token),
    )
    .await
    .context("timed out loading backend inventory")?
    .context("failed to load backend inventory")?;
    info!(
        vpcs = stores.vpcs.len(),
        lb_services = stores.lb_services.len(),
        ip_blocks = stores.ip_blocks.len(),
        "Backend inventory loaded"
    );

    let registry = NetworkConfigRegistry::new();
    let lb_selector = Arc::new(LbProviderSelector::new(
        backend.clone(),
        config.alternate_lb_enabled,
    ));
    let service = Arc::new(VpcService::new(
        backend,
        config.cluster_name.clone(),
        stores,
        registry.clone(),
        lb_selector,
    ));
    let metrics = Metrics::new().context("failed to register metrics")?;

    let (configs_synced, configs_ready) = oneshot::channel();
    let config_watcher = tokio::spawn(network_config_controller::run(
        client.clone(),
        service.clone(),
        token.clone(),
        configs_synced,
    ));
    let namespace_watcher = tokio::spawn(namespace_controller::run(
        client.clone(),
        registry,
        token.clone(),
    ));

    let gc = GarbageCollector::new(
        service.clone(),
        Arc::new(KubeNetworkInfoLister::new(client.clone())),
        metrics.clone(),
        config.gc_interval,
    );
    let gc_token = token.clone();
    let collector = tokio::spawn(async move { gc.run(gc_token).await });

    // Reconciles resolve default configs, so wait for the initial config list
    let synced = tokio::select! {
        _ = token.cancelled() => false,
        ready = configs_ready => ready.is_ok(),
    };
    if synced {
        let ctx = Arc::new(Context {
            client,
            service,
            metrics,
        });
        network_info_controller::run(ctx, token.clone()).await;
    } else {
        info!("Stopped before network configs were loaded");
    }

    // The controller returns early only if its stream ends
    token.cancel();
    for (name, handle) in [
        ("config watcher", config_watcher),
        ("namespace watcher", namespace_watcher),
        ("garbage collector", collector),
    ] {
        if let Err(e) = handle.await {
            error!("{} task failed: {}", name, e);
        }
    }

    info!("vpc-controller stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
