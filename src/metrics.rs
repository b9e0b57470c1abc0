//! Prometheus metrics for the slab engine
//!
//! Counters track allocation traffic per size class; gauges mirror the current
//! allocated/free partition of each slab.

use crate::slab::{SizeClass, SlabStatus};
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref ALLOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabsim_allocations_total", "Total allocations"),
        &["size_class", "source"]
    ).unwrap();

    pub static ref DEALLOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabsim_deallocations_total", "Total deallocation attempts"),
        &["size_class", "outcome"]
    ).unwrap();

    pub static ref SLAB_BLOCKS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("slabsim_slab_blocks", "Blocks per slab by state"),
        &["size_class", "state"]
    ).unwrap();
}

/// Initialize all metrics
pub fn init_metrics() {
    METRICS_REGISTRY.register(Box::new(ALLOCATIONS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(DEALLOCATIONS_TOTAL.clone())).ok();
    METRICS_REGISTRY.register(Box::new(SLAB_BLOCKS.clone())).ok();

    info!("Metrics initialized successfully");
}

/// Record an allocation served fresh or from the free stack
pub fn record_allocation(size_class: SizeClass, fresh: bool) {
    let source = if fresh { "fresh" } else { "reused" };
    let label = size_class.bytes().to_string();
    ALLOCATIONS_TOTAL
        .with_label_values(&[label.as_str(), source])
        .inc();
}

/// Record a deallocation outcome (`recycled`, `unmanaged`, `double_free`)
pub fn record_deallocation(size_class: SizeClass, outcome: &str) {
    let label = size_class.bytes().to_string();
    DEALLOCATIONS_TOTAL
        .with_label_values(&[label.as_str(), outcome])
        .inc();
}

/// Mirror a slab's current partition into the gauges
pub fn record_status(size_class: SizeClass, status: SlabStatus) {
    let label = size_class.bytes().to_string();
    SLAB_BLOCKS
        .with_label_values(&[label.as_str(), "allocated"])
        .set(status.allocated as i64);
    SLAB_BLOCKS
        .with_label_values(&[label.as_str(), "free"])
        .set(status.free as i64);
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::{Address, SlabRegistry};

    #[test]
    fn test_init_metrics() {
        init_metrics();
        init_metrics();
        // Registering twice should not panic
    }

    #[test]
    fn test_allocation_counters() {
        // Size class unique to this test; metrics are process-global
        let sc = SizeClass::new(7001).unwrap();
        let mut registry = SlabRegistry::new();

        let a = registry.allocate(sc);
        registry.deallocate(sc, a).unwrap();
        registry.allocate(sc);
        registry.deallocate(sc, Address::new(0xdead)).unwrap_err();

        let label = "7001";
        assert_eq!(ALLOCATIONS_TOTAL.with_label_values(&[label, "fresh"]).get(), 1);
        assert_eq!(ALLOCATIONS_TOTAL.with_label_values(&[label, "reused"]).get(), 1);
        assert_eq!(DEALLOCATIONS_TOTAL.with_label_values(&[label, "recycled"]).get(), 1);
        assert_eq!(DEALLOCATIONS_TOTAL.with_label_values(&[label, "unmanaged"]).get(), 1);
        assert_eq!(SLAB_BLOCKS.with_label_values(&[label, "allocated"]).get(), 1);
        assert_eq!(SLAB_BLOCKS.with_label_values(&[label, "free"]).get(), 0);
    }

    #[test]
    fn test_export_metrics() {
        init_metrics();
        record_allocation(SizeClass::new(7002).unwrap(), true);

        let text = export_metrics();
        assert!(text.contains("slabsim_allocations_total"));
        assert!(text.contains("size_class=\"7002\""));
    }
}
