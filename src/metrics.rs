// Prometheus metrics for admission control
//
// Exposes metrics on /metrics HTTP endpoint:
// - Admission decisions (counter, by decision)
// - Tracked clients (gauge)
// - Evicted clients (counter)

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref ADMISSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("admissions_total", "Admission decisions by outcome"),
        &["decision"]
    ).expect("Failed to create admissions metric");

    pub static ref TRACKED_CLIENTS: IntGauge = IntGauge::new(
        "rate_limit_tracked_clients",
        "Clients with a live token bucket as of the last sweep"
    ).expect("Failed to create tracked clients metric");

    pub static ref EVICTED_CLIENTS_TOTAL: IntCounter = IntCounter::new(
        "rate_limit_evicted_clients_total",
        "Total number of idle clients evicted by the sweep"
    ).expect("Failed to create evicted clients metric");
}

/// Initialize metrics registry
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn init() -> prometheus::Result<()> {
    register(Box::new(ADMISSIONS_TOTAL.clone()))?;
    register(Box::new(TRACKED_CLIENTS.clone()))?;
    register(Box::new(EVICTED_CLIENTS_TOTAL.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> prometheus::Result<()> {
    match REGISTRY.register(collector) {
        Err(prometheus::Error::AlreadyReg) => Ok(()),
        other => other,
    }
}

/// Record one admission decision
pub fn record_decision(allowed: bool) {
    let label = if allowed { "allowed" } else { "denied" };
    ADMISSIONS_TOTAL.with_label_values(&[label]).inc();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
