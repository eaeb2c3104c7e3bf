//! Outcome counters for reconciliation and garbage collection

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus counters on a private registry
#[derive(Clone)]
pub struct Metrics {
    /// Reconciliations by result ("success" or "error")
    pub reconcile_total: IntCounterVec,
    /// VPCs removed by garbage collection
    pub gc_deleted_total: IntCounter,
    /// Garbage collection deletions that failed
    pub gc_failed_total: IntCounter,
    pub registry: Arc<Registry>,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let reconcile_total = IntCounterVec::new(
            Opts::new("vpc_reconcile_total", "VPC reconciliations by result"),
            &["result"],
        )?;
        let gc_deleted_total = IntCounter::new(
            "vpc_gc_deleted_total",
            "VPCs deleted by garbage collection",
        )?;
        let gc_failed_total = IntCounter::new(
            "vpc_gc_failed_total",
            "Failed garbage collection deletions",
        )?;

        registry.register(Box::new(reconcile_total.clone()))?;
        registry.register(Box::new(gc_deleted_total.clone()))?;
        registry.register(Box::new(gc_failed_total.clone()))?;

        Ok(Self {
            reconcile_total,
            gc_deleted_total,
            gc_failed_total,
            registry,
        })
    }

    pub fn record_reconcile(&self, result: &str) {
        self.reconcile_total.with_label_values(&[result]).inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_gathered() {
        let metrics = Metrics::new().unwrap();
        metrics.record_reconcile("success");
        metrics.record_reconcile("success");
        metrics.gc_deleted_total.inc();

        let text = metrics.gather().unwrap();
        assert!(text.contains("vpc_reconcile_total{result=\"success\"} 2"));
        assert!(text.contains("vpc_gc_deleted_total 1"));
        assert!(text.contains("vpc_gc_failed_total 0"));
    }
}
