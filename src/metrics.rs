//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `curl_me_that_pipeline_runs_total` - Pipeline runs triggered by the annotation
//! - `curl_me_that_pipeline_failures_total` - Failed pipeline runs, labelled by reason
//! - `curl_me_that_config_maps_updated_total` - ConfigMaps successfully updated
//! - `curl_me_that_fetch_duration_seconds` - Duration of the outbound GET

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static PIPELINE_RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "curl_me_that_pipeline_runs_total",
        "Total number of pipeline runs triggered by the directive annotation",
    )
    .expect("Failed to create PIPELINE_RUNS_TOTAL metric - this should never happen")
});

static PIPELINE_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "curl_me_that_pipeline_failures_total",
            "Total number of failed pipeline runs, labelled by failure reason",
        ),
        &["reason"],
    )
    .expect("Failed to create PIPELINE_FAILURES_TOTAL metric - this should never happen")
});

static CONFIG_MAPS_UPDATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "curl_me_that_config_maps_updated_total",
        "Total number of ConfigMaps updated with fetched content",
    )
    .expect("Failed to create CONFIG_MAPS_UPDATED_TOTAL metric - this should never happen")
});

static FETCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "curl_me_that_fetch_duration_seconds",
            "Duration of the outbound GET in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create FETCH_DURATION metric - this should never happen")
});

/// Register all metrics with the registry. Call once at startup.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PIPELINE_RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PIPELINE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIG_MAPS_UPDATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FETCH_DURATION.clone()))?;
    Ok(())
}

pub fn increment_pipeline_runs() {
    PIPELINE_RUNS_TOTAL.inc();
}

pub fn increment_pipeline_failures(reason: &str) {
    PIPELINE_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_config_maps_updated() {
    CONFIG_MAPS_UPDATED_TOTAL.inc();
}

pub fn observe_fetch_duration(seconds: f64) {
    FETCH_DURATION.observe(seconds);
}
