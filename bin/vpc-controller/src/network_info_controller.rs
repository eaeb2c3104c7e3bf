//! NetworkInfo controller: one VPC reconciliation per NetworkInfo

use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use vpc_api::v1alpha1::{Condition, NetworkInfoStatus, VPCState};
use vpc_api::NetworkInfo;
use vpc_service::{Metrics, VpcError, VpcService};

/// Finalizer held until the namespace's VPCs are deleted
pub const FINALIZER: &str = "vpc.datum.net/vpc-cleanup";

const RETRY_DELAY: Duration = Duration::from_secs(10);
const PERMANENT_ERROR_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("NetworkInfo {0} has no namespace")]
    MissingNamespace(String),

    #[error(transparent)]
    Finalizer(#[from] kube_runtime::finalizer::Error<VpcError>),
}

impl ReconcileError {
    fn is_retryable(&self) -> bool {
        use kube_runtime::finalizer::Error as FinalizerError;
        match self {
            ReconcileError::MissingNamespace(_) => false,
            ReconcileError::Finalizer(FinalizerError::ApplyFailed(e))
            | ReconcileError::Finalizer(FinalizerError::CleanupFailed(e)) => e.is_retryable(),
            ReconcileError::Finalizer(_) => true,
        }
    }
}

pub struct Context {
    pub client: Client,
    pub service: Arc<VpcService>,
    pub metrics: Metrics,
}

/// Run until `token` is cancelled. Namespace changes requeue the
/// NetworkInfo objects living in that namespace.
pub async fn run(ctx: Arc<Context>, token: CancellationToken) {
    info!("Starting NetworkInfo reconciliation");

    let network_infos: Api<NetworkInfo> = Api::all(ctx.client.clone());
    let namespaces: Api<Namespace> = Api::all(ctx.client.clone());

    let controller = Controller::new(network_infos, watcher::Config::default());
    let store = controller.store();
    let reconciliations = controller
        .watches(namespaces, watcher::Config::default(), move |ns| {
            let name = ns.name_any();
            store
                .state()
                .into_iter()
                .filter(|ni| ni.namespace().as_deref() == Some(name.as_str()))
                .map(|ni| ObjectRef::from_obj(ni.as_ref()))
                .collect::<Vec<_>>()
        })
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!("Reconciled NetworkInfo {}", obj),
                Err(e) => warn!("NetworkInfo reconciliation stream error: {}", e),
            }
        });

    tokio::select! {
        _ = token.cancelled() => info!("NetworkInfo controller stopping"),
        _ = reconciliations => warn!("NetworkInfo controller stream ended"),
    }
}

#[instrument(skip_all, fields(namespace = %ni.namespace().unwrap_or_default(), name = %ni.name_any()))]
async fn reconcile(ni: Arc<NetworkInfo>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = ni
        .namespace()
        .ok_or_else(|| ReconcileError::MissingNamespace(ni.name_any()))?;
    let api: Api<NetworkInfo> = Api::namespaced(ctx.client.clone(), &namespace);

    let ctx = ctx.as_ref();
    Ok(finalizer(&api, FINALIZER, ni, |event| async move {
        match event {
            Event::Apply(ni) => apply(&ni, ctx).await,
            Event::Cleanup(ni) => cleanup(&ni, ctx).await,
        }
    })
    .await?)
}

async fn apply(ni: &NetworkInfo, ctx: &Context) -> Result<Action, VpcError> {
    let api: Api<NetworkInfo> = Api::namespaced(ctx.client.clone(), &ni.namespace().unwrap_or_default());
    match ensure_vpcs(ni, ctx).await {
        Ok(vpcs) => {
            let status = desired_status(ni.status.as_ref(), vpcs, Ok(()));
            patch_status(&api, ni, status).await?;
            ctx.metrics.record_reconcile("success");
            Ok(Action::await_change())
        }
        Err(e) => {
            let status = desired_status(
                ni.status.as_ref(),
                ni.status.as_ref().map(|s| s.vpcs.clone()).unwrap_or_default(),
                Err(&e),
            );
            if let Err(patch_err) = patch_status(&api, ni, status).await {
                warn!("failed to report reconcile error on status: {}", patch_err);
            }
            Err(e)
        }
    }
}

async fn ensure_vpcs(ni: &NetworkInfo, ctx: &Context) -> Result<Vec<VPCState>, VpcError> {
    let ns_name = ni.namespace().unwrap_or_default();
    let namespaces: Api<Namespace> = Api::all(ctx.client.clone());
    let namespace = namespaces
        .get_opt(&ns_name)
        .await?
        .ok_or_else(|| VpcError::NamespaceNotFound(ns_name.clone()))?;

    let vpcs = ctx.service.create_or_update_vpc(ni, &namespace).await?;
    let mut states = Vec::with_capacity(vpcs.len());
    for vpc in &vpcs {
        let state = match ctx.service.vpc_state(vpc).await {
            Ok(state) => state,
            Err(e) => {
                warn!(vpc = %vpc.id, "failed to read default SNAT IP: {}", e);
                VPCState {
                    name: vpc.id.clone(),
                    vpc_path: vpc.path.clone(),
                    private_ips: vpc.private_ips.clone(),
                    ..Default::default()
                }
            }
        };
        states.push(state);
    }
    Ok(states)
}

async fn cleanup(ni: &NetworkInfo, ctx: &Context) -> Result<Action, VpcError> {
    let namespace = ni.namespace().unwrap_or_default();
    let deleted = ctx.service.delete_vpcs_for_namespace(&namespace).await?;
    info!(namespace = %namespace, deleted, "NetworkInfo removed, VPCs deleted");
    Ok(Action::await_change())
}

fn error_policy(ni: Arc<NetworkInfo>, error: &ReconcileError, ctx: Arc<Context>) -> Action {
    ctx.metrics.record_reconcile("error");
    let retryable = error.is_retryable();
    error!(
        name = %ni.name_any(),
        namespace = %ni.namespace().unwrap_or_default(),
        retryable,
        "NetworkInfo reconciliation failed: {}",
        error
    );
    if retryable {
        Action::requeue(RETRY_DELAY)
    } else {
        Action::requeue(PERMANENT_ERROR_DELAY)
    }
}

/// Status for the outcome of a reconciliation. An unchanged Ready condition
/// keeps its transition time so repeated reconciles produce identical status.
fn desired_status(
    current: Option<&NetworkInfoStatus>,
    vpcs: Vec<VPCState>,
    outcome: Result<(), &VpcError>,
) -> NetworkInfoStatus {
    let mut condition = match outcome {
        Ok(()) => Condition::ready(true, "VpcReady", "VPC is realized"),
        Err(e) => Condition::ready(false, "VpcNotReady", e.to_string()),
    };
    let previous = current.and_then(|s| s.conditions.iter().find(|c| c.condition_type == "Ready"));
    condition.last_transition_time = match previous {
        Some(prev)
            if prev.status == condition.status
                && prev.reason == condition.reason
                && prev.message == condition.message =>
        {
            prev.last_transition_time.clone()
        }
        _ => Some(Utc::now().to_rfc3339()),
    };
    NetworkInfoStatus {
        vpcs,
        conditions: vec![condition],
    }
}

async fn patch_status(api: &Api<NetworkInfo>, ni: &NetworkInfo, status: NetworkInfoStatus) -> Result<(), VpcError> {
    if let Some(current) = ni.status.as_ref() {
        if current.vpcs == status.vpcs && current.conditions == status.conditions {
            return Ok(());
        }
    }
    let patch = json!({ "status": status });
    api.patch_status(&ni.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> VPCState {
        VPCState {
            name: "ns1_ab12cd34".to_string(),
            vpc_path: "/orgs/default/projects/proj/vpcs/ns1_ab12cd34".to_string(),
            default_snat_ip: "192.0.2.10".to_string(),
            private_ips: vec!["10.0.0.0/24".to_string()],
            lb_provider: "native".to_string(),
        }
    }

    #[test]
    fn test_unchanged_condition_keeps_transition_time() {
        let first = desired_status(None, vec![state()], Ok(()));
        let time = first.conditions[0].last_transition_time.clone();
        assert!(time.is_some());

        let second = desired_status(Some(&first), vec![state()], Ok(()));
        assert_eq!(second.conditions, first.conditions);
        assert_eq!(second.vpcs, first.vpcs);
        assert_eq!(second.conditions[0].last_transition_time, time);
    }

    #[test]
    fn test_error_sets_not_ready() {
        let ready = desired_status(None, vec![state()], Ok(()));
        let err = VpcError::SharedVpcNotReady {
            namespace: "ns-a".to_string(),
            shared: "ns-b".to_string(),
        };
        let failed = desired_status(Some(&ready), ready.vpcs.clone(), Err(&err));

        let condition = &failed.conditions[0];
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("VpcNotReady"));
        assert!(condition.message.as_deref().unwrap_or_default().contains("ns-b"));
        assert_eq!(failed.vpcs, ready.vpcs);
    }

    #[test]
    fn test_permanent_errors_back_off() {
        let err = ReconcileError::MissingNamespace("default".to_string());
        assert!(!err.is_retryable());

        let apply = ReconcileError::Finalizer(kube_runtime::finalizer::Error::ApplyFailed(
            VpcError::Timeout("cleanup".to_string()),
        ));
        assert!(apply.is_retryable());
    }
}
