//! Core VPC reconciliation building blocks
//!
//! This library provides:
//! - Keyed and indexed in-memory stores mirroring backend objects
//! - Network config registry with namespace bindings
//! - VPC builder computing the desired backend state
//! - Hierarchical request wrapper for single-call multi-object writes
//! - Retry policy shared by every backoff loop

pub mod builder;
pub mod error;
pub mod hierarchy;
pub mod lb_provider;
pub mod network_config;
pub mod registry;
pub mod retry;
pub mod store;

pub use builder::{build_vpc, VpcBuildInput};
pub use error::{CoreError, Result};
pub use lb_provider::LbProvider;
pub use network_config::NetworkConfig;
pub use registry::NetworkConfigRegistry;
pub use retry::{CallClass, RetryPolicy, Retryable};
pub use store::{IpBlockStore, LbServiceStore, ResourceStore, StoreObject, VpcStore};
