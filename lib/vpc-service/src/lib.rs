//! VPC reconciliation engine
//!
//! Composes the core building blocks with a backend client:
//! - Realization checks with rollback of half-created VPCs
//! - Load balancer provider selection
//! - Create/update/delete orchestration for namespace VPCs
//! - Startup population of the stores
//! - Garbage collection of VPCs whose NetworkInfo is gone

pub mod bootstrap;
pub mod error;
pub mod gc;
pub mod lb_provider;
pub mod metrics;
pub mod realization;
pub mod vpc;

#[cfg(test)]
mod fixtures;

pub use bootstrap::Stores;
pub use error::{Result, VpcError};
pub use gc::{GarbageCollector, KubeNetworkInfoLister, NetworkInfoLister, SweepReport};
pub use lb_provider::{LbProviderSelector, Selection};
pub use metrics::Metrics;
pub use realization::RealizationChecker;
pub use vpc::VpcService;
