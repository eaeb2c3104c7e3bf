//! Backend client contract

use async_trait::async_trait;
use vpc_api::backend::{
    ConnectivityProfile, LbService, NatRule, OrgRoot, RealizedEntity, SearchPage, Vpc, VpcInfo,
};

use crate::BackendError;

/// Calls the reconciler makes against the backend networking controller.
///
/// Implementations never retry; retry decisions belong to the caller's
/// `RetryPolicy`. Deletes of absent objects succeed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn get_vpc(&self, info: &VpcInfo) -> Result<Vpc, BackendError>;

    /// Delete a VPC, with `recursive` also removing everything under it
    async fn delete_vpc(&self, info: &VpcInfo, recursive: bool) -> Result<(), BackendError>;

    async fn get_lb_service(&self, info: &VpcInfo, id: &str) -> Result<LbService, BackendError>;

    /// Submit a hierarchical multi-object write in one call
    async fn patch_org_root(&self, root: &OrgRoot) -> Result<(), BackendError>;

    /// One page of a search query; `cursor` comes from the previous page
    async fn search(&self, query: &str, cursor: Option<String>)
        -> Result<SearchPage, BackendError>;

    /// Realization state of everything produced from `intent_path`
    async fn realized_entities(&self, intent_path: &str)
        -> Result<Vec<RealizedEntity>, BackendError>;

    async fn get_connectivity_profile(&self, path: &str)
        -> Result<ConnectivityProfile, BackendError>;

    /// GET `endpoint` and discard the body
    async fn probe(&self, endpoint: &str) -> Result<(), BackendError>;

    /// Delete any policy object by path
    async fn delete_by_path(&self, path: &str) -> Result<(), BackendError>;

    async fn list_nat_rules(&self, info: &VpcInfo) -> Result<Vec<NatRule>, BackendError>;
}
