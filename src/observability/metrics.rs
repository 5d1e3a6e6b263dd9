//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `instance_controller_reconciliations_total` - Total number of reconciliations
//! - `instance_controller_reconciliation_errors_total` - Total number of reconciliation errors
//! - `instance_controller_reconciliation_duration_seconds` - Duration of reconciliation cycles
//! - `instance_controller_build_failures_total` - Render, normalization or transform failures
//! - `instance_controller_objects_applied_total{operation}` - Child objects created or updated
//! - `instance_controller_objects_unchanged_total` - Child objects already in sync
//! - `instance_controller_sync_failures_total` - Per-object sync failures
//! - `instance_controller_gc_deletions_total` - Stale child objects deleted
//! - `instance_controller_gc_failures_total` - Stale child objects that could not be deleted
//! - `instance_controller_requeues_total{reason}` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "instance_controller_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static BUILD_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_build_failures_total",
        "Total number of render, normalization or transform failures",
    )
    .expect("Failed to create BUILD_FAILURES_TOTAL metric - this should never happen")
});

static OBJECTS_APPLIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "instance_controller_objects_applied_total",
            "Total number of child objects written, by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create OBJECTS_APPLIED_TOTAL metric - this should never happen")
});

static OBJECTS_UNCHANGED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_objects_unchanged_total",
        "Total number of child objects found already in sync",
    )
    .expect("Failed to create OBJECTS_UNCHANGED_TOTAL metric - this should never happen")
});

static SYNC_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_sync_failures_total",
        "Total number of per-object sync failures",
    )
    .expect("Failed to create SYNC_FAILURES_TOTAL metric - this should never happen")
});

static GC_DELETIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_gc_deletions_total",
        "Total number of stale child objects deleted",
    )
    .expect("Failed to create GC_DELETIONS_TOTAL metric - this should never happen")
});

static GC_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "instance_controller_gc_failures_total",
        "Total number of stale child objects that could not be deleted",
    )
    .expect("Failed to create GC_FAILURES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "instance_controller_requeues_total",
            "Total number of requeues, by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(BUILD_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_UNCHANGED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GC_DELETIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GC_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

/// Text exposition of every registered metric
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_build_failures() {
    BUILD_FAILURES_TOTAL.inc();
}

/// `operation` is `created` or `updated`
pub fn increment_objects_applied(operation: &str) {
    OBJECTS_APPLIED_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_objects_unchanged() {
    OBJECTS_UNCHANGED_TOTAL.inc();
}

pub fn increment_sync_failures() {
    SYNC_FAILURES_TOTAL.inc();
}

pub fn increment_gc_deletions() {
    GC_DELETIONS_TOTAL.inc();
}

pub fn increment_gc_failures() {
    GC_FAILURES_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // This should not panic - metrics should register successfully
        assert!(register_metrics().is_ok());
        assert!(!gather().is_empty());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        assert_eq!(RECONCILIATIONS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_objects_applied_by_operation() {
        let before = OBJECTS_APPLIED_TOTAL.with_label_values(&["created"]).get();
        increment_objects_applied("created");
        increment_objects_applied("updated");
        assert_eq!(
            OBJECTS_APPLIED_TOTAL.with_label_values(&["created"]).get(),
            before + 1u64
        );
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration(0.25);
        // Histogram observation has no return value; only checks it doesn't panic
    }
}
