/// API version v1alpha1 for VPC reconciler CRDs

pub mod network_info;
pub mod vpc_network_configuration;

pub use network_info::{Condition, NetworkInfo, NetworkInfoSpec, NetworkInfoStatus, VPCState};
pub use vpc_network_configuration::{
    VPCNetworkConfiguration, VPCNetworkConfigurationSpec, VPCNetworkConfigurationStatus,
};

/// API group for VPC reconciler resources
pub const API_GROUP: &str = "vpc.datum.net";
/// API version for VPC reconciler resources
pub const API_VERSION: &str = "v1alpha1";
