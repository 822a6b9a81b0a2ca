//! Prometheus metrics for the projection subsystems.
//!
//! Naming convention: `lt_<subsystem>_<metric>_<unit>`.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LIVE PROJECTION METRICS
    // =========================================================================

    /// Blocks dispersed by the live pipeline.
    pub static ref BLOCKS_DISPERSED: Counter = Counter::new(
        "lt_projection_blocks_dispersed_total",
        "Total blocks dispersed by the live pipeline"
    ).expect("metric creation failed");

    /// Per-block dispersal duration.
    pub static ref BLOCK_DISPERSE_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "lt_projection_block_disperse_duration_seconds",
            "Time spent dispersing one block"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).unwrap())
    ).expect("metric creation failed");

    /// Operations skipped because their kind is unknown.
    pub static ref UNKNOWN_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("lt_projection_unknown_operations_total", "Operations with unknown kind"),
        &["stage"]  // stage: real/virtual
    ).expect("metric creation failed");

    /// Undo frames deleted by the pruner.
    pub static ref UNDO_FRAMES_PRUNED: Counter = Counter::new(
        "lt_projection_undo_frames_pruned_total",
        "Undo frames deleted by the pruner"
    ).expect("metric creation failed");

    // =========================================================================
    // GENESIS IMPORT METRICS
    // =========================================================================

    /// Records handled, by record kind.
    pub static ref GENESIS_RECORDS: CounterVec = CounterVec::new(
        Opts::new("lt_genesis_records_total", "Genesis records handled"),
        &["kind"]
    ).expect("metric creation failed");

    /// Comments whose parent could not be resolved.
    pub static ref GENESIS_ORPHANED_COMMENTS: Counter = Counter::new(
        "lt_genesis_orphaned_comments_total",
        "Genesis comments stored without a resolvable parent"
    ).expect("metric creation failed");

    /// Parent-cache fetches that went to the persistent store.
    pub static ref GENESIS_CACHE_FETCHES: Counter = Counter::new(
        "lt_genesis_parent_cache_fetches_total",
        "Parent-cache misses resolved from the store"
    ).expect("metric creation failed");

    /// Post-pass reconciliation outcomes.
    pub static ref GENESIS_RECONCILIATIONS: CounterVec = CounterVec::new(
        Opts::new("lt_genesis_reconciliations_total", "Counter reconciliation tasks"),
        &["entity", "outcome"]  // entity: post/user, outcome: ok/failed
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BLOCKS_DISPERSED.clone()),
        Box::new(BLOCK_DISPERSE_DURATION.clone()),
        Box::new(UNKNOWN_OPERATIONS.clone()),
        Box::new(UNDO_FRAMES_PRUNED.clone()),
        Box::new(GENESIS_RECORDS.clone()),
        Box::new(GENESIS_ORPHANED_COMMENTS.clone()),
        Box::new(GENESIS_CACHE_FETCHES.clone()),
        Box::new(GENESIS_RECONCILIATIONS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|err| TelemetryError::MetricsInit(err.to_string()))?;
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|err| TelemetryError::MetricsInit(err.to_string()))?;
    String::from_utf8(buffer).map_err(|err| TelemetryError::MetricsInit(err.to_string()))
}

/// Timer guard observing a histogram on drop.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_encode() {
        let _ = register_metrics();
        BLOCKS_DISPERSED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("lt_projection_blocks_dispersed_total"));
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let before = BLOCK_DISPERSE_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&BLOCK_DISPERSE_DURATION);
        }
        assert_eq!(BLOCK_DISPERSE_DURATION.get_sample_count(), before + 1);
    }
}
