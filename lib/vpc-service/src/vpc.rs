//! VPC create/update/delete orchestration
//!
//! `create_or_update_vpc` walks a fixed sequence: resolve the namespace and
//! its network config, short-circuit for pre-created or shared VPCs, build
//! the desired VPC, submit it together with its children in one hierarchical
//! request, read it back, wait for realization of every submitted object and
//! only then commit the result to the store.

use k8s_openapi::api::core::v1::Namespace;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vpc_api::annotations;
use vpc_api::backend::lb_service::DEFAULT_LB_SERVICE_ID;
use vpc_api::backend::tag::{SCOPE_CLUSTER, SCOPE_NAMESPACE_UID};
use vpc_api::backend::{Vpc, VpcInfo};
use vpc_api::v1alpha1::VPCState;
use vpc_api::NetworkInfo;
use vpc_backend::BackendClient;
use vpc_core::builder::{build_attachment, build_lb_service};
use vpc_core::hierarchy::wrap_vpc_hierarchy;
use vpc_core::{
    build_vpc, CoreError, LbProvider, NetworkConfig, NetworkConfigRegistry, RetryPolicy,
    VpcBuildInput,
};

use crate::lb_provider::Selection;
use crate::{LbProviderSelector, RealizationChecker, Result, Stores, VpcError};

/// VpcService reconciles namespace VPCs against the backend
pub struct VpcService {
    client: Arc<dyn BackendClient>,
    cluster: String,
    stores: Stores,
    registry: NetworkConfigRegistry,
    lb_selector: Arc<LbProviderSelector>,
    realization: RealizationChecker,
}

impl VpcService {
    pub fn new(
        client: Arc<dyn BackendClient>,
        cluster: impl Into<String>,
        stores: Stores,
        registry: NetworkConfigRegistry,
        lb_selector: Arc<LbProviderSelector>,
    ) -> Self {
        let realization = RealizationChecker::new(client.clone(), RetryPolicy::realization_poll());
        Self {
            client,
            cluster: cluster.into(),
            stores,
            registry,
            lb_selector,
            realization,
        }
    }

    pub fn with_realization_policy(mut self, policy: RetryPolicy) -> Self {
        self.realization = RealizationChecker::new(self.client.clone(), policy);
        self
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn registry(&self) -> &NetworkConfigRegistry {
        &self.registry
    }

    pub fn lb_selector(&self) -> &LbProviderSelector {
        &self.lb_selector
    }

    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    /// Resolve the config for a namespace: explicit override first, then the
    /// namespace annotation (which also refreshes the registry binding), then
    /// an earlier binding, then the default config.
    pub async fn network_config_for_namespace(
        &self,
        namespace: &Namespace,
        override_name: Option<&str>,
    ) -> Result<NetworkConfig> {
        let ns_name = namespace_name(namespace);
        if let Some(name) = override_name.filter(|n| !n.trim().is_empty()) {
            return Ok(self.registry.get_config(name).await?);
        }
        if let Some(name) = annotations::get(
            namespace.metadata.annotations.as_ref(),
            annotations::NETWORK_CONFIG,
        ) {
            self.registry.bind_namespace(ns_name, name).await;
            return Ok(self.registry.get_config(name).await?);
        }
        Ok(self.registry.config_for_namespace(ns_name).await?)
    }

    /// Look up a registered config and check that it can produce a VPC
    pub async fn validate_network_config(&self, name: &str) -> Result<NetworkConfig> {
        let config = self.registry.get_config(name).await?;
        config.validate()?;
        Ok(config)
    }

    /// Make the backend match the declared intent of `network_info` and return
    /// the VPCs serving its namespace.
    #[instrument(skip_all, fields(namespace = %namespace_name(namespace)))]
    pub async fn create_or_update_vpc(
        &self,
        network_info: &NetworkInfo,
        namespace: &Namespace,
    ) -> Result<Vec<Vpc>> {
        let ns_name = namespace_name(namespace);
        let config = self
            .network_config_for_namespace(namespace, network_info.spec.network_config.as_deref())
            .await?;
        config.validate()?;

        if let Some(info) = config.pre_created_vpc_info()? {
            let vpc = self.client.get_vpc(&info).await?;
            debug!(path = %vpc.path, config = %config.name, "using pre-created VPC");
            return Ok(vec![vpc]);
        }

        if let Some(shared) = shared_namespace(namespace) {
            let vpcs = self.stores.vpcs.vpcs_by_namespace(shared);
            if vpcs.is_empty() {
                return Err(VpcError::SharedVpcNotReady {
                    namespace: ns_name.to_string(),
                    shared: shared.to_string(),
                });
            }
            debug!(shared, count = vpcs.len(), "using shared VPC");
            return Ok(vpcs);
        }

        let ns_uid = namespace.metadata.uid.as_deref().ok_or_else(|| VpcError::MissingUid {
            kind: "Namespace",
            name: ns_name.to_string(),
        })?;
        let owner_uid = network_info
            .metadata
            .uid
            .as_deref()
            .ok_or_else(|| VpcError::MissingUid {
                kind: "NetworkInfo",
                name: network_info.metadata.name.clone().unwrap_or_default(),
            })?;

        let mut owned = self.stores.vpcs.vpcs_by_namespace(ns_name);
        if owned.len() > 1 {
            warn!(count = owned.len(), "namespace owns several VPCs, reconciling the first");
        }
        let existing = if owned.is_empty() {
            None
        } else {
            Some(owned.swap_remove(0))
        };

        let selection = self.lb_selector.select(&config, &self.stores.lb_services).await;
        let provider_changed = provider_changed(existing.as_ref(), selection);

        let desired = build_vpc(&VpcBuildInput {
            config: &config,
            namespace: ns_name,
            namespace_uid: ns_uid,
            owner_uid,
            cluster: &self.cluster,
            existing: existing.as_ref(),
            lb_provider: selection.provider,
            provider_changed,
        })?;
        let Some(desired) = desired else {
            debug!("VPC up to date");
            return Ok(existing.into_iter().collect());
        };

        let vpc = self
            .submit(&config, desired, selection.provider, existing.is_none())
            .await?;
        Ok(vec![vpc])
    }

    /// Submit, read back, wait for realization and commit
    async fn submit(
        &self,
        config: &NetworkConfig,
        desired: Vpc,
        provider: LbProvider,
        is_create: bool,
    ) -> Result<Vpc> {
        let info = VpcInfo {
            org: config.org.clone(),
            project: config.project.clone(),
            vpc_id: desired.id.clone(),
        };
        let vpc_path = info.path();
        let lb_service = (provider == LbProvider::Native).then(|| build_lb_service(&desired, &vpc_path));
        let attachment = if is_create {
            build_attachment(config, &vpc_path)
        } else {
            None
        };

        let mut targets = vec![vpc_path.clone()];
        targets.extend(lb_service.as_ref().map(|s| s.path.clone()));
        targets.extend(attachment.as_ref().map(|a| a.path.clone()));

        let root = wrap_vpc_hierarchy(&config.org, &config.project, desired, lb_service, attachment);
        if let Err(e) = self.client.patch_org_root(&root).await {
            if !is_create {
                return Err(e.into());
            }
            // the backend sometimes creates the tree despite reporting failure
            match self.client.get_vpc(&info).await {
                Ok(_) => warn!(path = %vpc_path, "VPC exists although submission failed: {}", e),
                Err(read) => {
                    debug!(path = %vpc_path, "read-back after failed submission: {}", read);
                    return Err(e.into());
                }
            }
        }

        let vpc = self.client.get_vpc(&info).await?;
        let results = self
            .realization
            .check_sequence(&targets, is_create.then_some(&info))
            .await?;
        debug!(path = %vpc_path, checked = results.len(), "realized");

        let lb_service = if provider == LbProvider::Native {
            Some(self.client.get_lb_service(&info, DEFAULT_LB_SERVICE_ID).await?)
        } else {
            None
        };

        self.stores.vpcs.apply(vpc.clone());
        if let Some(lb_service) = lb_service {
            self.stores.lb_services.apply(lb_service);
        }
        info!(
            path = %vpc_path,
            provider = %provider,
            created = is_create,
            "VPC reconciled"
        );
        Ok(vpc)
    }

    /// VPCs serving `namespace`, following the shared-VPC annotation
    pub fn get_vpcs_by_namespace(&self, namespace: &Namespace) -> Vec<Vpc> {
        let target = shared_namespace(namespace).unwrap_or_else(|| namespace_name(namespace));
        self.stores.vpcs.vpcs_by_namespace(target)
    }

    /// Delete a VPC and everything below it, then drop it from the stores.
    /// VPCs not created by this cluster are left alone.
    pub async fn delete_vpc(&self, vpc: &Vpc) -> Result<()> {
        if vpc.tag(SCOPE_CLUSTER) != Some(self.cluster.as_str()) {
            warn!(path = %vpc.path, "refusing to delete VPC not owned by this cluster");
            return Ok(());
        }
        let info = vpc.info().map_err(CoreError::from)?;
        self.client.delete_vpc(&info, true).await?;

        let mut deleted = vpc.clone();
        deleted.marked_for_delete = true;
        self.stores.vpcs.apply(deleted);
        if let Some(mut lb_service) = self.stores.lb_services.lb_service_for_vpc(&vpc.id) {
            lb_service.marked_for_delete = true;
            self.stores.lb_services.apply(lb_service);
        }
        // the recursive delete takes the namespace's private blocks with it
        if let Some(ns_uid) = vpc.tag(SCOPE_NAMESPACE_UID) {
            for mut block in self.stores.ip_blocks.ip_blocks_by_namespace_uid(ns_uid) {
                block.marked_for_delete = true;
                self.stores.ip_blocks.apply(block);
            }
        }
        info!(path = %vpc.path, "VPC deleted");
        Ok(())
    }

    /// Delete every VPC owned by `namespace`, stopping at the first failure
    pub async fn delete_vpcs_for_namespace(&self, namespace: &str) -> Result<usize> {
        let vpcs = self.stores.vpcs.vpcs_by_namespace(namespace);
        for vpc in &vpcs {
            self.delete_vpc(vpc).await?;
        }
        Ok(vpcs.len())
    }

    /// Location of every cached VPC
    pub fn list_vpc_info(&self) -> Vec<VpcInfo> {
        self.stores
            .vpcs
            .list()
            .iter()
            .filter_map(|vpc| vpc.info().ok())
            .collect()
    }

    /// Translated address of the VPC's first enabled SNAT rule
    pub async fn default_snat_ip(&self, vpc: &Vpc) -> Result<Option<String>> {
        let info = vpc.info().map_err(CoreError::from)?;
        let rules = self.client.list_nat_rules(&info).await?;
        Ok(rules
            .into_iter()
            .find(|r| r.is_snat() && r.enabled)
            .and_then(|r| r.translated_network))
    }

    /// Status entry reported on the NetworkInfo for `vpc`
    pub async fn vpc_state(&self, vpc: &Vpc) -> Result<VPCState> {
        let default_snat_ip = self.default_snat_ip(vpc).await?.unwrap_or_default();
        let provider = self.lb_selector.cached().await.unwrap_or_default();
        Ok(VPCState {
            name: vpc.id.clone(),
            vpc_path: vpc.path.clone(),
            default_snat_ip,
            private_ips: vpc.private_ips.clone(),
            lb_provider: provider.to_string(),
        })
    }
}

fn namespace_name(namespace: &Namespace) -> &str {
    namespace.metadata.name.as_deref().unwrap_or_default()
}

/// Namespace whose VPC `namespace` reuses, if it names another one
fn shared_namespace(namespace: &Namespace) -> Option<&str> {
    annotations::get(
        namespace.metadata.annotations.as_ref(),
        annotations::SHARED_VPC_NAMESPACE,
    )
    .filter(|shared| *shared != namespace_name(namespace))
}

/// A provider change forces an update. An uncached `None` never does on its
/// own since it may come from an unreadable profile.
fn provider_changed(existing: Option<&Vpc>, selection: Selection) -> bool {
    let Some(existing) = existing else {
        return false;
    };
    let reliable = selection.cacheable || selection.provider != LbProvider::None;
    selection.changed
        || (reliable && existing.lb_endpoint_enabled() != (selection.provider == LbProvider::Native))
}
