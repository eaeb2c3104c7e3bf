//! Desired backend state for a namespace's VPC
//!
//! `build_vpc` returns `Ok(None)` when the cached VPC already matches the
//! declared state. Callers treat that as "nothing to submit", which keeps
//! repeated reconciliation of unchanged intent free of backend calls.
//!
//! CIDR lists are compared by size only. The backend accepts appended CIDRs
//! but rejects edits to existing ones, so an in-place edit is left alone.

use sha2::{Digest, Sha256};
use vpc_api::backend::lb_service::DEFAULT_LB_SERVICE_ID;
use vpc_api::backend::tag::{SCOPE_CLUSTER, SCOPE_NAMESPACE, SCOPE_NAMESPACE_UID, SCOPE_NETWORK_INFO_UID};
use vpc_api::backend::vpc::LoadBalancerVpcEndpoint;
use vpc_api::backend::{LbService, Tag, Vpc, VpcAttachment};

use crate::{CoreError, LbProvider, NetworkConfig, Result};

/// Fixed id of the attachment created under each VPC
pub const DEFAULT_ATTACHMENT_ID: &str = "default";

const MAX_ID_PREFIX: usize = 40;
const MAX_DISPLAY_NAME: usize = 255;

/// Everything the builder looks at
#[derive(Clone, Debug)]
pub struct VpcBuildInput<'a> {
    pub config: &'a NetworkConfig,
    pub namespace: &'a str,
    pub namespace_uid: &'a str,
    /// UID of the NetworkInfo owning the VPC
    pub owner_uid: &'a str,
    pub cluster: &'a str,
    pub existing: Option<&'a Vpc>,
    pub lb_provider: LbProvider,
    pub provider_changed: bool,
}

/// Compute the VPC to submit, or `None` if the existing one is up to date
pub fn build_vpc(input: &VpcBuildInput<'_>) -> Result<Option<Vpc>> {
    let lb_endpoint = Some(LoadBalancerVpcEndpoint {
        enabled: input.lb_provider == LbProvider::Native,
    });

    if let Some(existing) = input.existing {
        let owner_changed = existing.tag(SCOPE_NETWORK_INFO_UID) != Some(input.owner_uid);
        if !input.provider_changed && !owner_changed && cidrs_unchanged(existing, input.config) {
            return Ok(None);
        }
        let mut updated = existing.clone();
        updated.private_ips = input.config.private_ips.clone();
        updated.external_ipv4_blocks = input.config.external_ip_blocks.clone();
        updated.load_balancer_vpc_endpoint = lb_endpoint;
        // a recreated NetworkInfo adopts the VPC
        set_tag(&mut updated.tags, SCOPE_NETWORK_INFO_UID, input.owner_uid);
        return Ok(Some(updated));
    }

    if input.config.private_ips.is_empty() {
        return Err(CoreError::InvalidConfiguration {
            name: input.config.name.clone(),
            reason: "private IPs are required to create a VPC".to_string(),
        });
    }

    Ok(Some(Vpc {
        id: vpc_id(input.namespace, input.owner_uid),
        display_name: truncate(&format!("{}-{}", input.cluster, input.namespace), MAX_DISPLAY_NAME),
        path: String::new(),
        resource_type: "Vpc".to_string(),
        tags: vec![
            Tag::new(SCOPE_CLUSTER, input.cluster),
            Tag::new(SCOPE_NAMESPACE, input.namespace),
            Tag::new(SCOPE_NAMESPACE_UID, input.namespace_uid),
            Tag::new(SCOPE_NETWORK_INFO_UID, input.owner_uid),
        ],
        private_ips: input.config.private_ips.clone(),
        external_ipv4_blocks: input.config.external_ip_blocks.clone(),
        default_gateway_path: input.config.default_gateway_path.clone(),
        edge_cluster_path: input.config.edge_cluster_path.clone(),
        load_balancer_vpc_endpoint: lb_endpoint,
        marked_for_delete: false,
        revision: None,
    }))
}

/// Deterministic VPC id: stable across retries of the same owner
pub fn vpc_id(namespace: &str, owner_uid: &str) -> String {
    let digest = Sha256::digest(owner_uid.as_bytes());
    let suffix = hex::encode(&digest[..4]);
    format!("{}_{}", truncate(namespace, MAX_ID_PREFIX), suffix)
}

/// Native load balancer service placed inside `vpc`
pub fn build_lb_service(vpc: &Vpc, vpc_path: &str) -> LbService {
    LbService {
        id: DEFAULT_LB_SERVICE_ID.to_string(),
        display_name: DEFAULT_LB_SERVICE_ID.to_string(),
        path: format!("{}/vpc-lbs/{}", vpc_path, DEFAULT_LB_SERVICE_ID),
        resource_type: "LBService".to_string(),
        connectivity_path: vpc_path.to_string(),
        size: "SMALL".to_string(),
        tags: vpc.tags.clone(),
        marked_for_delete: false,
    }
}

/// Attachment binding the VPC to the config's connectivity profile
pub fn build_attachment(config: &NetworkConfig, vpc_path: &str) -> Option<VpcAttachment> {
    let profile = config.connectivity_profile.as_ref()?;
    Some(VpcAttachment {
        id: DEFAULT_ATTACHMENT_ID.to_string(),
        display_name: DEFAULT_ATTACHMENT_ID.to_string(),
        path: format!("{}/attachments/{}", vpc_path, DEFAULT_ATTACHMENT_ID),
        resource_type: "VpcAttachment".to_string(),
        vpc_connectivity_profile: Some(profile.clone()),
        marked_for_delete: false,
    })
}

fn cidrs_unchanged(existing: &Vpc, config: &NetworkConfig) -> bool {
    existing.private_ips.len() == config.private_ips.len()
        && existing.external_ipv4_blocks.len() == config.external_ip_blocks.len()
}

fn set_tag(tags: &mut Vec<Tag>, scope: &str, value: &str) {
    match tags.iter_mut().find(|t| t.scope == scope) {
        Some(t) => t.tag = value.to_string(),
        None => tags.push(Tag::new(scope, value)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(private_ips: &[&str]) -> NetworkConfig {
        NetworkConfig {
            name: "default".to_string(),
            org: "default".to_string(),
            project: "proj".to_string(),
            default_gateway_path: Some("/infra/tier-0s/t0".to_string()),
            edge_cluster_path: Some("/infra/sites/default/enforcement-points/default/edge-clusters/ec".to_string()),
            private_ips: private_ips.iter().map(|s| s.to_string()).collect(),
            default_subnet_size: 26,
            is_default: true,
            ..Default::default()
        }
    }

    fn input<'a>(config: &'a NetworkConfig, existing: Option<&'a Vpc>) -> VpcBuildInput<'a> {
        VpcBuildInput {
            config,
            namespace: "ns1",
            namespace_uid: "ns-uid-1",
            owner_uid: "ni-uid-1",
            cluster: "c1",
            existing,
            lb_provider: LbProvider::Native,
            provider_changed: false,
        }
    }

    #[test]
    fn test_create_from_config() {
        let cfg = config(&["10.0.0.0/24"]);
        let vpc = build_vpc(&input(&cfg, None)).unwrap().expect("new VPC");

        assert_eq!(vpc.private_ips, vec!["10.0.0.0/24"]);
        assert_eq!(vpc.id, vpc_id("ns1", "ni-uid-1"));
        assert_eq!(vpc.display_name, "c1-ns1");
        assert!(vpc.lb_endpoint_enabled());
        assert_eq!(vpc.tag(SCOPE_NAMESPACE), Some("ns1"));
        assert_eq!(vpc.tag(SCOPE_NETWORK_INFO_UID), Some("ni-uid-1"));
        assert_eq!(vpc.default_gateway_path.as_deref(), Some("/infra/tier-0s/t0"));
    }

    #[test]
    fn test_id_is_deterministic() {
        let cfg = config(&["10.0.0.0/24"]);
        let first = build_vpc(&input(&cfg, None)).unwrap().unwrap();
        let second = build_vpc(&input(&cfg, None)).unwrap().unwrap();
        assert_eq!(first.id, second.id);

        let uid = uuid::Uuid::new_v4().to_string();
        assert_eq!(vpc_id("ns1", &uid), vpc_id("ns1", &uid));
        assert_ne!(vpc_id("ns1", &uid), vpc_id("ns1", "other"));
    }

    #[test]
    fn test_unchanged_returns_none() {
        let cfg = config(&["10.0.0.0/24", "10.1.0.0/24"]);
        let mut existing = build_vpc(&input(&cfg, None)).unwrap().unwrap();
        existing.private_ips.reverse();

        assert_eq!(build_vpc(&input(&cfg, Some(&existing))).unwrap(), None);
    }

    #[test]
    fn test_same_size_edit_is_noop() {
        let cfg = config(&["10.0.0.0/24"]);
        let existing = build_vpc(&input(&cfg, None)).unwrap().unwrap();

        let edited = config(&["10.9.0.0/24"]);
        assert_eq!(build_vpc(&input(&edited, Some(&existing))).unwrap(), None);

        let mut with_external = config(&["10.0.0.0/24"]);
        with_external.external_ip_blocks = vec!["192.0.2.0/24".to_string()];
        assert!(build_vpc(&input(&with_external, Some(&existing))).unwrap().is_some());
    }

    #[test]
    fn test_new_owner_is_tagged_on_update() {
        let cfg = config(&["10.0.0.0/24"]);
        let existing = build_vpc(&input(&cfg, None)).unwrap().unwrap();

        let mut recreated = input(&cfg, Some(&existing));
        recreated.owner_uid = "ni-uid-2";
        let updated = build_vpc(&recreated).unwrap().expect("update");

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.tag(SCOPE_NETWORK_INFO_UID), Some("ni-uid-2"));
        assert_eq!(updated.tags.len(), existing.tags.len());
    }

    #[test]
    fn test_provider_change_forces_update() {
        let cfg = config(&["10.0.0.0/24"]);
        let mut existing = build_vpc(&input(&cfg, None)).unwrap().unwrap();
        existing.path = "/orgs/default/projects/proj/vpcs/x".to_string();

        let mut changed = input(&cfg, Some(&existing));
        changed.provider_changed = true;
        changed.lb_provider = LbProvider::Alternate;

        let updated = build_vpc(&changed).unwrap().expect("update");
        assert!(!updated.lb_endpoint_enabled());
        assert_eq!(updated.path, existing.path);
        assert_eq!(updated.tags, existing.tags);
    }

    #[test]
    fn test_cidr_change_updates_only_cidrs() {
        let cfg = config(&["10.0.0.0/24"]);
        let mut existing = build_vpc(&input(&cfg, None)).unwrap().unwrap();
        existing.id = "backend-id".to_string();
        existing.revision = Some(7);

        let grown = config(&["10.0.0.0/24", "10.2.0.0/24"]);
        let updated = build_vpc(&input(&grown, Some(&existing))).unwrap().expect("update");

        assert_eq!(updated.id, "backend-id");
        assert_eq!(updated.revision, Some(7));
        assert_eq!(updated.private_ips.len(), 2);
    }

    #[test]
    fn test_create_requires_private_ips() {
        let cfg = config(&[]);
        assert!(matches!(
            build_vpc(&input(&cfg, None)),
            Err(CoreError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_attachment_needs_profile() {
        let mut cfg = config(&["10.0.0.0/24"]);
        assert!(build_attachment(&cfg, "/orgs/o/projects/p/vpcs/v").is_none());

        cfg.connectivity_profile = Some("/orgs/o/projects/p/vpc-connectivity-profiles/default".to_string());
        let attachment = build_attachment(&cfg, "/orgs/o/projects/p/vpcs/v").unwrap();
        assert_eq!(attachment.path, "/orgs/o/projects/p/vpcs/v/attachments/default");
    }
}
