use serde::{Deserialize, Serialize};

/// Tag scope holding the owning cluster's name
pub const SCOPE_CLUSTER: &str = "vpc-op/cluster";
/// Tag scope holding the owning namespace's name
pub const SCOPE_NAMESPACE: &str = "vpc-op/namespace";
/// Tag scope holding the owning namespace's UID
pub const SCOPE_NAMESPACE_UID: &str = "vpc-op/namespace_uid";
/// Tag scope holding the UID of the NetworkInfo that owns the object
pub const SCOPE_NETWORK_INFO_UID: &str = "vpc-op/networkinfo_uid";

/// Scope/value pair attached to backend objects
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub tag: String,
}

impl Tag {
    pub fn new(scope: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            tag: tag.into(),
        }
    }
}

/// Values of every tag carrying `scope`
pub fn values<'a>(tags: &'a [Tag], scope: &str) -> Vec<&'a str> {
    tags.iter()
        .filter(|t| t.scope == scope)
        .map(|t| t.tag.as_str())
        .collect()
}

/// First value carrying `scope`
pub fn first<'a>(tags: &'a [Tag], scope: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.scope == scope)
        .map(|t| t.tag.as_str())
}
