//! Load balancer provider selection
//!
//! The decision is computed once and reused until [`LbProviderSelector::invalidate`]
//! is called, typically when a VPCNetworkConfiguration changes. After an
//! invalidation the next selection reports whether the provider moved, so
//! existing VPCs can have their load balancer endpoint flag rewritten.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vpc_backend::BackendClient;
use vpc_core::{LbProvider, LbServiceStore, NetworkConfig, RetryPolicy};

/// Endpoint answering only when the alternate provider is onboarded
pub const ALTERNATE_PROBE_ENDPOINT: &str = "/infra/alb-onboarding-workflow";

#[derive(Debug, Default)]
struct Decision {
    current: Option<LbProvider>,
    // value before the last invalidate
    previous: Option<LbProvider>,
}

/// Selection outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub provider: LbProvider,
    /// The provider differs from the one in use before the last invalidate
    pub changed: bool,
    /// The decision rests on a successful read and is reused until invalidated
    pub cacheable: bool,
}

pub struct LbProviderSelector {
    client: Arc<dyn BackendClient>,
    alternate_enabled: bool,
    probe_policy: RetryPolicy,
    decision: RwLock<Decision>,
}

impl LbProviderSelector {
    pub fn new(client: Arc<dyn BackendClient>, alternate_enabled: bool) -> Self {
        Self {
            client,
            alternate_enabled,
            probe_policy: RetryPolicy::transient_network(),
            decision: RwLock::new(Decision::default()),
        }
    }

    pub fn with_probe_policy(mut self, policy: RetryPolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    /// Cached provider, if one has been decided
    pub async fn cached(&self) -> Option<LbProvider> {
        self.decision.read().await.current
    }

    /// Forget the cached decision; the next `select` recomputes it
    pub async fn invalidate(&self) {
        let mut decision = self.decision.write().await;
        if let Some(current) = decision.current.take() {
            decision.previous = Some(current);
            info!(provider = %current, "LB provider cache invalidated");
        }
    }

    /// Return the cached provider or decide one for `config`
    pub async fn select(&self, config: &NetworkConfig, lb_services: &LbServiceStore) -> Selection {
        if let Some(provider) = self.cached().await {
            return Selection {
                provider,
                changed: false,
                cacheable: true,
            };
        }

        let (provider, cacheable) = self.decide(config, lb_services).await;

        let mut decision = self.decision.write().await;
        // another reconciliation may have decided while we were probing
        if let Some(existing) = decision.current {
            return Selection {
                provider: existing,
                changed: false,
                cacheable: true,
            };
        }
        let changed = decision.previous.is_some_and(|prev| prev != provider);
        if cacheable {
            decision.current = Some(provider);
            decision.previous = None;
        }
        info!(provider = %provider, changed, cacheable, "selected LB provider");
        Selection {
            provider,
            changed,
            cacheable,
        }
    }

    /// Compute a provider and whether it may be cached
    async fn decide(&self, config: &NetworkConfig, lb_services: &LbServiceStore) -> (LbProvider, bool) {
        if self.alternate_enabled && self.alternate_available().await {
            if lb_services.is_empty() {
                return (LbProvider::Alternate, true);
            }
            debug!(
                services = lb_services.len(),
                "alternate provider available but native LB services exist"
            );
        }

        let Some(profile_path) = config.connectivity_profile.as_deref() else {
            return (LbProvider::None, false);
        };
        match self.client.get_connectivity_profile(profile_path).await {
            Ok(profile) if profile.edge_cluster_enabled() => (LbProvider::Native, true),
            Ok(_) => (LbProvider::None, true),
            Err(e) => {
                warn!(profile = profile_path, "failed to read connectivity profile: {}", e);
                (LbProvider::None, false)
            }
        }
    }

    async fn alternate_available(&self) -> bool {
        let client = self.client.clone();
        let result = self
            .probe_policy
            .run(|_| {
                let client = client.clone();
                async move { client.probe(ALTERNATE_PROBE_ENDPOINT).await }
            })
            .await;
        match result {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                debug!("alternate provider not onboarded");
                false
            }
            Err(e) => {
                warn!("alternate provider probe failed: {}", e);
                false
            }
        }
    }
}
