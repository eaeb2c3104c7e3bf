//! VPC reconciler API types
//!
//! This library defines:
//! - NetworkInfo: per-namespace declared VPC intent and its realized state
//! - VPCNetworkConfiguration: cluster-scoped network defaults bound to namespaces
//! - Namespace annotations recognized by the reconciler
//! - Wire types for the backend networking controller's policy API

pub mod annotations;
pub mod backend;
pub mod v1alpha1;

pub use v1alpha1::{NetworkInfo, VPCNetworkConfiguration};
