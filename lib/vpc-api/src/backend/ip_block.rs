use serde::{Deserialize, Serialize};

use super::tag::{self, Tag};

/// IP address block registered on the backend
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IpBlock {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    pub cidr: String,

    /// "EXTERNAL" or "PRIVATE"
    #[serde(default)]
    pub visibility: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub marked_for_delete: bool,
}

impl IpBlock {
    pub fn tag(&self, scope: &str) -> Option<&str> {
        tag::first(&self.tags, scope)
    }
}
