//! Shared builders for unit tests

use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use vpc_api::backend::profile::ServiceGateway;
use vpc_api::backend::{ConnectivityProfile, RealizedEntity};
use vpc_api::v1alpha1::NetworkInfoSpec;
use vpc_api::NetworkInfo;
use vpc_backend::{BackendClient, BackendError, MockBackendClient};
use vpc_core::{NetworkConfig, NetworkConfigRegistry, RetryPolicy};

use crate::{LbProviderSelector, Stores, VpcService};

pub const CLUSTER: &str = "c1";
pub const PROFILE_PATH: &str = "/orgs/default/projects/proj/vpc-connectivity-profiles/default";

pub fn entities(state: &str) -> Vec<RealizedEntity> {
    vec![RealizedEntity {
        id: "e1".to_string(),
        entity_type: "RealizedVpc".to_string(),
        state: state.to_string(),
        ..Default::default()
    }]
}

/// Realization polling with three attempts and millisecond sleeps
pub fn fast_poll() -> RetryPolicy {
    RetryPolicy::realization_poll()
        .with_max_attempts(3)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
        .with_jitter(0.0)
}

pub fn fast_probe() -> RetryPolicy {
    RetryPolicy::transient_network()
        .with_max_attempts(3)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
        .with_jitter(0.0)
}

pub fn unavailable() -> BackendError {
    BackendError::Status {
        method: "GET".to_string(),
        path: "/".to_string(),
        status: 503,
        message: "service unavailable".to_string(),
    }
}

pub fn config(private_ips: &[&str]) -> NetworkConfig {
    NetworkConfig {
        name: "default".to_string(),
        org: "default".to_string(),
        project: "proj".to_string(),
        default_gateway_path: Some("/infra/tier-0s/t0".to_string()),
        private_ips: private_ips.iter().map(|s| s.to_string()).collect(),
        default_subnet_size: 26,
        default_access_mode: "Private".to_string(),
        connectivity_profile: Some(PROFILE_PATH.to_string()),
        is_default: true,
        ..Default::default()
    }
}

pub fn profile(edge_cluster: bool) -> ConnectivityProfile {
    ConnectivityProfile {
        id: "default".to_string(),
        path: PROFILE_PATH.to_string(),
        service_gateway: Some(ServiceGateway {
            enable: edge_cluster,
            edge_cluster_paths: vec!["/infra/sites/default/enforcement-points/default/edge-clusters/ec".to_string()],
        }),
    }
}

pub fn namespace(name: &str, annotations: &[(&str, &str)]) -> Namespace {
    let annotations: BTreeMap<String, String> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: Some(format!("{}-uid", name)),
            annotations: Some(annotations),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn network_info(namespace: &str) -> NetworkInfo {
    let mut ni = NetworkInfo::new("default", NetworkInfoSpec::default());
    ni.metadata.namespace = Some(namespace.to_string());
    ni.metadata.uid = Some(format!("{}-ni-uid", namespace));
    ni
}

/// Service over `client` with no registered configs
pub fn vpc_service(client: MockBackendClient, stores: Stores) -> VpcService {
    let client: Arc<dyn BackendClient> = Arc::new(client);
    let selector = Arc::new(LbProviderSelector::new(client.clone(), false));
    VpcService::new(client, CLUSTER, stores, NetworkConfigRegistry::new(), selector)
        .with_realization_policy(fast_poll())
}
