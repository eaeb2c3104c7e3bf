use serde::{Deserialize, Serialize};

use super::tag::Tag;

/// Fixed id of the load balancer service created inside each VPC
pub const DEFAULT_LB_SERVICE_ID: &str = "default";

/// Native load balancer service bound to a VPC
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LbService {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default = "lb_service_resource_type")]
    pub resource_type: String,

    /// Path of the VPC the service is attached to
    #[serde(default)]
    pub connectivity_path: String,

    #[serde(default = "default_size")]
    pub size: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub marked_for_delete: bool,
}

fn lb_service_resource_type() -> String {
    "LBService".to_string()
}

fn default_size() -> String {
    "SMALL".to_string()
}

impl LbService {
    /// Id of the VPC owning this service, taken from the connectivity path
    pub fn vpc_id(&self) -> Option<&str> {
        self.connectivity_path
            .rsplit_once("/vpcs/")
            .map(|(_, id)| id)
            .filter(|id| !id.is_empty() && !id.contains('/'))
    }
}
