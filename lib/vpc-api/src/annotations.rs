//! Annotations read from Namespace and VPCNetworkConfiguration objects

use std::collections::BTreeMap;

/// Names the VPCNetworkConfiguration a namespace should use.
/// Absent means the default configuration.
pub const NETWORK_CONFIG: &str = "vpc.datum.net/network_config";

/// Names another namespace whose VPC should be shared instead of creating one.
pub const SHARED_VPC_NAMESPACE: &str = "vpc.datum.net/shared_vpc_namespace";

/// Marks a VPCNetworkConfiguration as the cluster default when set to "true".
pub const DEFAULT_NETWORK_CONFIG: &str = "vpc.datum.net/default";

/// Read an annotation value, treating empty strings as absent
pub fn get<'a>(annotations: Option<&'a BTreeMap<String, String>>, key: &str) -> Option<&'a str> {
    annotations
        .and_then(|a| a.get(key))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ignores_blank_values() {
        let mut annotations = BTreeMap::new();
        annotations.insert(NETWORK_CONFIG.to_string(), "  ".to_string());
        annotations.insert(SHARED_VPC_NAMESPACE.to_string(), "kube-system".to_string());

        assert_eq!(get(Some(&annotations), NETWORK_CONFIG), None);
        assert_eq!(get(Some(&annotations), SHARED_VPC_NAMESPACE), Some("kube-system"));
        assert_eq!(get(None, SHARED_VPC_NAMESPACE), None);
    }
}
