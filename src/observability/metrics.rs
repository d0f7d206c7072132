//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `cert_policy_resolutions_total{outcome}` - Object resolutions by outcome (`found`, `absent`, or an error label)
//! - `cert_policy_resolution_duration_seconds` - Duration of a full resolution, discovery included
//! - `cert_policy_discovery_errors_total` - Failed API discovery rounds
//! - `cert_policy_hub_config_loads_total` - Hub kubeconfig derivations (cache misses)
//! - `cert_policy_hub_config_load_errors_total` - Failed hub kubeconfig derivations

use crate::resolver::{GenericObject, ResolveError};
use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RESOLUTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cert_policy_resolutions_total",
            "Total number of generic object resolutions by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RESOLUTIONS_TOTAL metric - this should never happen")
});

static RESOLUTION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cert_policy_resolution_duration_seconds",
            "Duration of generic object resolution in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RESOLUTION_DURATION metric - this should never happen")
});

static DISCOVERY_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_policy_discovery_errors_total",
        "Total number of failed API discovery rounds",
    )
    .expect("Failed to create DISCOVERY_ERRORS_TOTAL metric - this should never happen")
});

static HUB_CONFIG_LOADS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_policy_hub_config_loads_total",
        "Total number of hub kubeconfig derivations",
    )
    .expect("Failed to create HUB_CONFIG_LOADS_TOTAL metric - this should never happen")
});

static HUB_CONFIG_LOAD_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_policy_hub_config_load_errors_total",
        "Total number of failed hub kubeconfig derivations",
    )
    .expect("Failed to create HUB_CONFIG_LOAD_ERRORS_TOTAL metric - this should never happen")
});

/// Register every metric with the controller registry
///
/// Safe to call more than once; collectors already present are skipped.
///
/// # Errors
///
/// Any registration failure other than a duplicate.
pub fn register_metrics() -> Result<()> {
    register(Box::new(RESOLUTIONS_TOTAL.clone()))?;
    register(Box::new(RESOLUTION_DURATION.clone()))?;
    register(Box::new(DISCOVERY_ERRORS_TOTAL.clone()))?;
    register(Box::new(HUB_CONFIG_LOADS_TOTAL.clone()))?;
    register(Box::new(HUB_CONFIG_LOAD_ERRORS_TOTAL.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn observe_resolution(
    result: &Result<Option<GenericObject>, ResolveError>,
    duration: f64,
) {
    let outcome = match result {
        Ok(Some(_)) => "found",
        Ok(None) => "absent",
        Err(e) => e.kind_label(),
    };
    RESOLUTIONS_TOTAL.with_label_values(&[outcome]).inc();
    RESOLUTION_DURATION.observe(duration);
}

pub fn increment_discovery_errors() {
    DISCOVERY_ERRORS_TOTAL.inc();
}

pub fn increment_hub_config_loads() {
    HUB_CONFIG_LOADS_TOTAL.inc();
}

pub fn increment_hub_config_load_errors() {
    HUB_CONFIG_LOAD_ERRORS_TOTAL.inc();
}
