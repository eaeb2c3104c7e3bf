use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VPCNetworkConfiguration holds the backend placement and addressing
/// defaults for every VPC created in namespaces bound to it
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vpc.datum.net",
    version = "v1alpha1",
    kind = "VPCNetworkConfiguration",
    plural = "vpcnetworkconfigurations",
    shortname = "vpcnetconfig",
    derive = "Default",
    status = "VPCNetworkConfigurationStatus",
    printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.project"}"#,
    printcolumn = r#"{"name":"VPC","type":"string","jsonPath":".spec.vpc"}"#,
)]
#[serde(rename_all = "camelCase")]
pub struct VPCNetworkConfigurationSpec {
    /// Backend project path, `/orgs/<org>/projects/<project>`
    pub project: String,

    /// Path of an out-of-band VPC to use instead of creating one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc: Option<String>,

    /// Gateway path used as the VPC's default uplink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_gateway_path: Option<String>,

    /// Edge cluster backing the VPC's services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_cluster_path: Option<String>,

    /// VPC connectivity profile path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_connectivity_profile: Option<String>,

    /// External IP block paths
    #[serde(default)]
    pub external_ip_blocks: Vec<String>,

    /// Private CIDRs for VPCs created from this configuration
    #[serde(default)]
    pub private_ips: Vec<String>,

    /// Default subnet prefix size
    #[serde(default = "default_subnet_size")]
    pub default_subnet_size: u32,

    /// Default access mode for pod subnets: Public, Private or PrivateTGW
    #[serde(default = "default_access_mode")]
    pub default_subnet_access_mode: String,
}

/// Status of a VPCNetworkConfiguration
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VPCNetworkConfigurationStatus {
    /// Namespaces currently bound to this configuration
    #[serde(default)]
    pub namespaces: Vec<String>,
}

fn default_subnet_size() -> u32 {
    26
}

fn default_access_mode() -> String {
    "Private".to_string()
}
