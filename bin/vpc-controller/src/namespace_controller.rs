//! Namespace watcher maintaining namespace-to-config bindings

use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client, ResourceExt};
use kube_runtime::watcher::{self, watcher, Event};
use kube_runtime::WatchStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vpc_api::annotations;
use vpc_core::NetworkConfigRegistry;

pub async fn run(client: Client, registry: NetworkConfigRegistry, token: CancellationToken) {
    info!("Starting Namespace watcher");

    let api: Api<Namespace> = Api::all(client);
    let mut events = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();

    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = events.next() => event,
        };
        match event {
            Some(Ok(event)) => handle(&registry, event).await,
            Some(Err(e)) => warn!("Namespace watch error: {}", e),
            None => break,
        }
    }
    info!("Namespace watcher stopped");
}

async fn handle(registry: &NetworkConfigRegistry, event: Event<Namespace>) {
    match event {
        Event::Apply(ns) | Event::InitApply(ns) => sync_binding(registry, &ns).await,
        Event::Delete(ns) => registry.unbind_namespace(&ns.name_any()).await,
        Event::Init | Event::InitDone => {}
    }
}

/// Bind the namespace to its annotated config, or drop a stale binding
async fn sync_binding(registry: &NetworkConfigRegistry, ns: &Namespace) {
    let name = ns.name_any();
    match annotations::get(ns.metadata.annotations.as_ref(), annotations::NETWORK_CONFIG) {
        Some(config) => registry.bind_namespace(&name, config).await,
        None => registry.unbind_namespace(&name).await,
    }
}
