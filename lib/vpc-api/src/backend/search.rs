use serde::{Deserialize, Serialize};

use super::tag::Tag;

/// One page of a search query
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,

    /// Opaque cursor for the next page, absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    /// Total number of matches across all pages
    #[serde(default)]
    pub result_count: u64,
}

/// Minimal view of any policy object, used when only identity matters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyResource {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub parent_path: String,

    #[serde(default)]
    pub resource_type: String,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub marked_for_delete: bool,
}
