//! Wire types for the backend networking controller's policy API
//!
//! Field names follow the backend's JSON (snake_case), so these types
//! deserialize directly from REST responses and search results.

pub mod hierarchy;
pub mod ip_block;
pub mod lb_service;
pub mod profile;
pub mod realization;
pub mod search;
pub mod tag;
pub mod vpc;

pub use hierarchy::OrgRoot;
pub use ip_block::IpBlock;
pub use lb_service::LbService;
pub use profile::{ConnectivityProfile, NatRule};
pub use realization::{RealizationResult, RealizationState, RealizedEntity};
pub use search::{PolicyResource, SearchPage};
pub use tag::Tag;
pub use vpc::{Vpc, VpcAttachment, VpcInfo};
