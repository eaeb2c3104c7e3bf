use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tag::{self, Tag};

/// Backend VPC object
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default = "vpc_resource_type")]
    pub resource_type: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Private CIDRs
    #[serde(default)]
    pub private_ips: Vec<String>,

    /// External IP block paths
    #[serde(default)]
    pub external_ipv4_blocks: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_gateway_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_cluster_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_vpc_endpoint: Option<LoadBalancerVpcEndpoint>,

    #[serde(default)]
    pub marked_for_delete: bool,

    #[serde(rename = "_revision", skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

/// Load balancer endpoint settings of a VPC
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerVpcEndpoint {
    #[serde(default)]
    pub enabled: bool,
}

fn vpc_resource_type() -> String {
    "Vpc".to_string()
}

impl Vpc {
    /// Whether the native load balancer endpoint is enabled
    pub fn lb_endpoint_enabled(&self) -> bool {
        self.load_balancer_vpc_endpoint
            .as_ref()
            .map(|e| e.enabled)
            .unwrap_or(false)
    }

    /// First tag value for `scope`
    pub fn tag(&self, scope: &str) -> Option<&str> {
        tag::first(&self.tags, scope)
    }

    /// Parse org/project/id out of the backend path
    pub fn info(&self) -> Result<VpcInfo, PathError> {
        VpcInfo::parse(&self.path)
    }
}

/// Attachment binding a VPC to a connectivity profile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcAttachment {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default = "attachment_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_connectivity_profile: Option<String>,

    #[serde(default)]
    pub marked_for_delete: bool,
}

fn attachment_resource_type() -> String {
    "VpcAttachment".to_string()
}

/// Malformed backend path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} path: {path:?}")]
pub struct PathError {
    pub kind: &'static str,
    pub path: String,
}

/// Location of a VPC in the org/project hierarchy
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VpcInfo {
    pub org: String,
    pub project: String,
    pub vpc_id: String,
}

impl VpcInfo {
    /// Parse `/orgs/<org>/projects/<project>/vpcs/<id>`
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            ["orgs", org, "projects", project, "vpcs", id]
                if !org.is_empty() && !project.is_empty() && !id.is_empty() =>
            {
                Ok(Self {
                    org: org.to_string(),
                    project: project.to_string(),
                    vpc_id: id.to_string(),
                })
            }
            _ => Err(PathError {
                kind: "vpc",
                path: path.to_string(),
            }),
        }
    }

    /// Backend path of this VPC
    pub fn path(&self) -> String {
        format!(
            "/orgs/{}/projects/{}/vpcs/{}",
            self.org, self.project, self.vpc_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vpc_info_parse() {
        let info = VpcInfo::parse("/orgs/default/projects/proj-1/vpcs/ns1_ab12cd34").unwrap();
        assert_eq!(info.org, "default");
        assert_eq!(info.project, "proj-1");
        assert_eq!(info.vpc_id, "ns1_ab12cd34");
        assert_eq!(info.path(), "/orgs/default/projects/proj-1/vpcs/ns1_ab12cd34");
    }

    #[test]
    fn test_vpc_info_parse_rejects_other_paths() {
        assert!(VpcInfo::parse("/orgs/default/projects/proj-1").is_err());
        assert!(VpcInfo::parse("/orgs//projects/p/vpcs/v").is_err());
        assert!(VpcInfo::parse("/infra/tier-0s/t0").is_err());
    }

    #[test]
    fn test_vpc_deserialize_from_backend_json() {
        let json = serde_json::json!({
            "id": "v1",
            "display_name": "v1",
            "path": "/orgs/o/projects/p/vpcs/v1",
            "resource_type": "Vpc",
            "private_ips": ["10.0.0.0/24"],
            "load_balancer_vpc_endpoint": {"enabled": true},
            "tags": [{"scope": "vpc-op/cluster", "tag": "c1"}],
            "_revision": 3
        });
        let vpc: Vpc = serde_json::from_value(json).unwrap();
        assert!(vpc.lb_endpoint_enabled());
        assert_eq!(vpc.tag(tag::SCOPE_CLUSTER), Some("c1"));
        assert_eq!(vpc.revision, Some(3));
        assert!(!vpc.marked_for_delete);
    }
}
