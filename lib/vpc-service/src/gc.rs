//! Garbage collection of VPCs whose NetworkInfo no longer exists
//!
//! Each sweep compares the NetworkInfo UIDs recorded on cached VPCs with the
//! UIDs currently listed in the cluster. A sweep is skipped when the listing
//! fails, so an API outage never looks like "everything was deleted".

use async_trait::async_trait;
use kube::api::{Api, ListParams};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vpc_api::backend::{PolicyResource, Vpc};
use vpc_api::NetworkInfo;
use vpc_backend::{search_all, SearchQuery};

use crate::{Metrics, Result, VpcError, VpcService};

/// Child kinds removed before their VPC, in deletion order
pub const CLEANUP_ORDER: &[&str] = &["VpcSubnetPort", "LBVirtualServer", "LBPool"];

/// Source of the NetworkInfo UIDs that are still alive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkInfoLister: Send + Sync {
    async fn list_uids(&self) -> Result<HashSet<String>>;
}

/// Lists NetworkInfo objects across all namespaces
pub struct KubeNetworkInfoLister {
    api: Api<NetworkInfo>,
}

impl KubeNetworkInfoLister {
    pub fn new(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NetworkInfoLister for KubeNetworkInfoLister {
    async fn list_uids(&self) -> Result<HashSet<String>> {
        let list = self.api.list_metadata(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|obj| obj.metadata.uid)
            .collect())
    }
}

/// Outcome of one sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// NetworkInfo UIDs with VPCs but no live object
    pub orphans: usize,
    pub deleted: usize,
    pub failed: usize,
    /// The listing failed and nothing was attempted
    pub skipped: bool,
}

pub struct GarbageCollector {
    service: Arc<VpcService>,
    lister: Arc<dyn NetworkInfoLister>,
    metrics: Metrics,
    interval: Duration,
}

impl GarbageCollector {
    pub fn new(
        service: Arc<VpcService>,
        lister: Arc<dyn NetworkInfoLister>,
        metrics: Metrics,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            lister,
            metrics,
            interval,
        }
    }

    /// Sweep every `interval` until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "garbage collector started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.sweep(&token).await;
                    if report.orphans > 0 || report.skipped {
                        info!(?report, "garbage collection sweep finished");
                    }
                }
            }
        }
        info!("garbage collector stopped");
    }

    /// One pass over the store. Orphans are handled independently; a failure
    /// is counted and the sweep moves on.
    pub async fn sweep(&self, token: &CancellationToken) -> SweepReport {
        let live = match self.lister.list_uids().await {
            Ok(uids) => uids,
            Err(e) => {
                warn!("skipping garbage collection, NetworkInfo listing failed: {}", e);
                return SweepReport {
                    skipped: true,
                    ..Default::default()
                };
            }
        };

        let vpcs = &self.service.stores().vpcs;
        let mut orphans: Vec<String> = vpcs
            .owner_uids(self.service.cluster())
            .difference(&live)
            .cloned()
            .collect();
        orphans.sort();

        let mut report = SweepReport {
            orphans: orphans.len(),
            ..Default::default()
        };
        for uid in &orphans {
            for vpc in vpcs.vpcs_by_network_info(uid) {
                match self.cleanup_vpc(&vpc, token).await {
                    Ok(()) => {
                        report.deleted += 1;
                        self.metrics.gc_deleted_total.inc();
                    }
                    Err(e) => {
                        report.failed += 1;
                        self.metrics.gc_failed_total.inc();
                        warn!(owner = %uid, path = %vpc.path, "failed to collect VPC: {}", e);
                    }
                }
            }
        }
        report
    }

    /// Remove the VPC's children in dependency order, then the VPC itself
    async fn cleanup_vpc(&self, vpc: &Vpc, token: &CancellationToken) -> Result<()> {
        let client = self.service.client();
        let prefix = format!("{}/", vpc.path);
        for resource_type in CLEANUP_ORDER {
            let query = SearchQuery::resource_type(resource_type).under_path(&prefix);
            let children: Vec<PolicyResource> = search_all(client.as_ref(), &query).await?;
            for child in children {
                if token.is_cancelled() {
                    return Err(VpcError::Timeout(format!("cleanup of {} cancelled", vpc.path)));
                }
                client.delete_by_path(&child.path).await?;
                debug!(path = %child.path, kind = resource_type, "deleted VPC child");
            }
        }
        self.service.delete_vpc(vpc).await
    }
}
