//! VPCNetworkConfiguration watcher feeding the config registry

use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use kube_runtime::watcher::{self, watcher, Event};
use kube_runtime::WatchStreamExt;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vpc_api::VPCNetworkConfiguration;
use vpc_core::NetworkConfig;
use vpc_service::VpcService;

/// Watch configs until cancelled; `synced` fires once the initial list is applied
pub async fn run(
    client: Client,
    service: Arc<VpcService>,
    token: CancellationToken,
    synced: oneshot::Sender<()>,
) {
    info!("Starting VPCNetworkConfiguration watcher");
    let mut synced = Some(synced);

    let api: Api<VPCNetworkConfiguration> = Api::all(client);
    let mut events = watcher(api.clone(), watcher::Config::default())
        .default_backoff()
        .boxed();

    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = events.next() => event,
        };
        match event {
            Some(Ok(Event::InitDone)) => mark_synced(&mut synced),
            Some(Ok(event)) => handle(&api, &service, event).await,
            Some(Err(e)) => warn!("VPCNetworkConfiguration watch error: {}", e),
            None => break,
        }
    }
    info!("VPCNetworkConfiguration watcher stopped");
}

async fn handle(
    api: &Api<VPCNetworkConfiguration>,
    service: &VpcService,
    event: Event<VPCNetworkConfiguration>,
) {
    match event {
        Event::Apply(obj) | Event::InitApply(obj) => apply(api, service, &obj).await,
        Event::Delete(obj) => {
            let name = obj.name_any();
            if service.registry().remove_config(&name).await.is_some() {
                service.lb_selector().invalidate().await;
            }
        }
        Event::Init | Event::InitDone => {}
    }
}

/// Signal the first completed initial list; relists after a desync are ignored
fn mark_synced(synced: &mut Option<oneshot::Sender<()>>) {
    if let Some(tx) = synced.take() {
        info!("VPCNetworkConfiguration initial list applied");
        // receiver is gone if startup was cancelled
        let _ = tx.send(());
    }
}

async fn apply(api: &Api<VPCNetworkConfiguration>, service: &VpcService, obj: &VPCNetworkConfiguration) {
    let name = obj.name_any();
    let config = NetworkConfig::from_crd(obj);
    // invalid configs stay registered so reconciles report the problem
    if let Err(e) = config.validate() {
        warn!(config = %name, "network config is invalid: {}", e);
    }

    let previous = service.registry().get_config(&name).await.ok();
    if previous.as_ref() != Some(&config) {
        service.registry().register_config(config).await;
        if previous.is_some() {
            service.lb_selector().invalidate().await;
        }
    }

    let namespaces = service.registry().namespaces_for_config(&name).await;
    let current = obj.status.as_ref().map(|s| s.namespaces.as_slice()).unwrap_or_default();
    if current == namespaces.as_slice() {
        return;
    }
    let patch = json!({ "status": { "namespaces": namespaces } });
    match api
        .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => debug!(config = %name, "updated bound namespaces"),
        Err(e) => warn!(config = %name, "failed to update status: {}", e),
    }
}
