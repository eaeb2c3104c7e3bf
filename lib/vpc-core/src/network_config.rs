//! Resolved network configuration for VPCs in bound namespaces

use ipnetwork::IpNetwork;
use vpc_api::annotations;
use vpc_api::backend::VpcInfo;
use vpc_api::VPCNetworkConfiguration;

use crate::{CoreError, Result};

/// Subnet access modes accepted in configs
pub const ACCESS_MODES: &[&str] = &["Public", "Private", "PrivateTGW"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkConfig {
    pub name: String,
    /// Project path as declared, `/orgs/<org>/projects/<project>`
    pub project_path: String,
    pub org: String,
    pub project: String,
    pub default_gateway_path: Option<String>,
    pub edge_cluster_path: Option<String>,
    pub external_ip_blocks: Vec<String>,
    pub private_ips: Vec<String>,
    pub default_subnet_size: u32,
    pub default_access_mode: String,
    /// Out-of-band VPC to read instead of creating one
    pub pre_created_vpc: Option<String>,
    pub connectivity_profile: Option<String>,
    pub is_default: bool,
}

impl NetworkConfig {
    /// Convert a VPCNetworkConfiguration object. A malformed project path
    /// leaves org and project empty for `validate` to reject.
    pub fn from_crd(obj: &VPCNetworkConfiguration) -> Self {
        let (org, project) = parse_project_path(&obj.spec.project).unwrap_or_default();
        let is_default = annotations::get(
            obj.metadata.annotations.as_ref(),
            annotations::DEFAULT_NETWORK_CONFIG,
        )
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            project_path: obj.spec.project.clone(),
            org,
            project,
            default_gateway_path: obj.spec.default_gateway_path.clone(),
            edge_cluster_path: obj.spec.edge_cluster_path.clone(),
            external_ip_blocks: obj.spec.external_ip_blocks.clone(),
            private_ips: obj.spec.private_ips.clone(),
            default_subnet_size: obj.spec.default_subnet_size,
            default_access_mode: obj.spec.default_subnet_access_mode.clone(),
            pre_created_vpc: obj.spec.vpc.clone().filter(|v| !v.is_empty()),
            connectivity_profile: obj.spec.vpc_connectivity_profile.clone(),
            is_default,
        }
    }

    pub fn is_pre_created(&self) -> bool {
        self.pre_created_vpc.is_some()
    }

    /// Location of the pre-created VPC, if any
    pub fn pre_created_vpc_info(&self) -> Result<Option<VpcInfo>> {
        match &self.pre_created_vpc {
            Some(path) => Ok(Some(VpcInfo::parse(path)?)),
            None => Ok(None),
        }
    }

    /// Reject configs that cannot produce a VPC. Pre-created configs only
    /// need a parseable VPC path; others need at least one private CIDR.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| CoreError::InvalidConfiguration {
            name: self.name.clone(),
            reason,
        };

        if self.org.is_empty() || self.project.is_empty() {
            return Err(invalid(format!(
                "malformed project path {:?}",
                self.project_path
            )));
        }
        if self.is_pre_created() {
            self.pre_created_vpc_info()?;
            return Ok(());
        }
        if self.private_ips.is_empty() {
            return Err(invalid("private IPs are required".to_string()));
        }
        for cidr in &self.private_ips {
            cidr.parse::<IpNetwork>()
                .map_err(|e| invalid(format!("invalid private CIDR {:?}: {}", cidr, e)))?;
        }
        if !self.default_access_mode.is_empty()
            && !ACCESS_MODES.contains(&self.default_access_mode.as_str())
        {
            return Err(invalid(format!(
                "unknown access mode {:?}",
                self.default_access_mode
            )));
        }
        if self.default_subnet_size == 0 || self.default_subnet_size > 32 {
            return Err(invalid(format!(
                "default subnet size {} out of range",
                self.default_subnet_size
            )));
        }
        Ok(())
    }
}

/// Split `/orgs/<org>/projects/<project>` into its ids
pub fn parse_project_path(path: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
    match parts.as_slice() {
        ["orgs", org, "projects", project] if !org.is_empty() && !project.is_empty() => {
            Some((org.to_string(), project.to_string()))
        }
        _ => None,
    }
}
