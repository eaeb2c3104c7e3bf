use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// NetworkInfo declares that a namespace needs a VPC and reports the
/// VPC state realized for it on the backend. One per namespace.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vpc.datum.net",
    version = "v1alpha1",
    kind = "NetworkInfo",
    plural = "networkinfos",
    namespaced,
    derive = "Default",
    status = "NetworkInfoStatus",
    printcolumn = r#"{"name":"VPC","type":"string","jsonPath":".status.vpcs[0].name"}"#,
    printcolumn = r#"{"name":"SNAT","type":"string","jsonPath":".status.vpcs[0].defaultSNATIP"}"#,
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfoSpec {
    /// Optional override of the VPCNetworkConfiguration resolved from the
    /// namespace annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_config: Option<String>,
}

/// Observed state of a NetworkInfo
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfoStatus {
    /// VPCs serving this namespace (owned or shared)
    #[serde(default)]
    pub vpcs: Vec<VPCState>,

    /// Conditions describing the status
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Realized state of one VPC
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VPCState {
    /// Backend VPC id
    pub name: String,

    /// Backend path of the VPC
    #[serde(default)]
    pub vpc_path: String,

    /// Source NAT address used for egress traffic
    #[serde(rename = "defaultSNATIP", default)]
    pub default_snat_ip: String,

    /// Private CIDRs allocated to the VPC
    #[serde(default)]
    pub private_ips: Vec<String>,

    /// Load balancer provider in use: "none", "native" or "alternate"
    #[serde(default)]
    pub lb_provider: String,
}

/// Condition for NetworkInfo status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[serde(rename = "type")]
    pub condition_type: String,

    /// Status: "True", "False", "Unknown"
    pub status: String,

    /// Reason for the condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last transition time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// A "Ready" condition with the given status
    pub fn ready(ready: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            condition_type: "Ready".to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
            last_transition_time: None,
        }
    }
}
