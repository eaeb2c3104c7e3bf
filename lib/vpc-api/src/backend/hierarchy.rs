use serde::{Deserialize, Serialize};

use super::lb_service::LbService;
use super::vpc::{Vpc, VpcAttachment};

/// Root of a hierarchical multi-object submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrgRoot {
    pub resource_type: String,

    #[serde(default)]
    pub children: Vec<HierarchyChild>,
}

impl OrgRoot {
    pub fn new(children: Vec<HierarchyChild>) -> Self {
        Self {
            resource_type: "OrgRoot".to_string(),
            children,
        }
    }
}

/// Node in a hierarchical submission, discriminated by `resource_type`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum HierarchyChild {
    /// Reference to an existing parent (org or project) that is not modified
    ChildResourceReference {
        id: String,
        target_type: String,
        #[serde(default)]
        children: Vec<HierarchyChild>,
    },
    ChildVpc {
        #[serde(rename = "Vpc")]
        vpc: VpcNode,
        #[serde(default)]
        marked_for_delete: bool,
    },
    #[serde(rename = "ChildLBService")]
    ChildLbService {
        #[serde(rename = "LBService")]
        lb_service: LbService,
        #[serde(default)]
        marked_for_delete: bool,
    },
    ChildVpcAttachment {
        #[serde(rename = "VpcAttachment")]
        attachment: VpcAttachment,
        #[serde(default)]
        marked_for_delete: bool,
    },
}

/// VPC together with the children submitted under it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VpcNode {
    #[serde(flatten)]
    pub vpc: Vpc,

    #[serde(default)]
    pub children: Vec<HierarchyChild>,
}
