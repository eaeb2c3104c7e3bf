use serde::{Deserialize, Serialize};

/// VPC connectivity profile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityProfile {
    pub id: String,

    #[serde(default)]
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_gateway: Option<ServiceGateway>,
}

/// Service gateway settings of a connectivity profile
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceGateway {
    #[serde(default)]
    pub enable: bool,

    #[serde(default)]
    pub edge_cluster_paths: Vec<String>,
}

impl ConnectivityProfile {
    /// Whether the profile places services on an edge cluster
    pub fn edge_cluster_enabled(&self) -> bool {
        self.service_gateway
            .as_ref()
            .map(|g| g.enable && !g.edge_cluster_paths.is_empty())
            .unwrap_or(false)
    }
}

/// NAT rule in a VPC's NAT section
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NatRule {
    pub id: String,

    #[serde(default)]
    pub action: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_network: Option<String>,

    #[serde(default)]
    pub enabled: bool,
}

impl NatRule {
    pub fn is_snat(&self) -> bool {
        self.action.eq_ignore_ascii_case("SNAT")
    }
}
