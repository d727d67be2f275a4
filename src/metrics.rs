//! Prometheus metrics collection for b12.
//!
//! Exposed on the optional `/metrics` HTTP endpoint.
//!
//! - `b12_command_total{command}` - Commands completed by path
//! - `b12_command_duration_seconds{command}` - Handler latency, including suspension
//! - `b12_command_errors_total{command,kind}` - Dispatch and handler failures
//! - `b12_cache_requests_total{resource,outcome}` - How each cache request was served
//! - `b12_cache_fetch_failures_total{resource}` - Fetches that resolved empty

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Commands
// ========================================================================

/// Commands processed by path.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Command latency by path.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by path and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Resource cache
// ========================================================================

/// Cache requests by resource and outcome (memory, coalesced, disk, fetch).
pub static CACHE_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Fetches that failed or returned an undecodable body.
pub static CACHE_FETCH_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Metrics recorded before `init` are dropped.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("b12_command_total", "Commands processed by path"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("b12_command_duration_seconds", "Command latency by path")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("b12_command_errors_total", "Command errors by path and kind"), &["command", "kind"]));
    register!(CACHE_REQUESTS, IntCounterVec::new(Opts::new("b12_cache_requests_total", "Cache requests by resource and outcome"), &["resource", "outcome"]));
    register!(CACHE_FETCH_FAILURES, IntCounterVec::new(Opts::new("b12_cache_fetch_failures_total", "Failed cache fetches by resource"), &["resource"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

fn get_histogram_vec(metric: &OnceLock<HistogramVec>) -> Option<&HistogramVec> {
    metric.get()
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = get_counter_vec(&COMMAND_COUNTER) {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = get_histogram_vec(&COMMAND_LATENCY) {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, kind: &str) {
    if let Some(c) = get_counter_vec(&COMMAND_ERRORS) {
        c.with_label_values(&[command, kind]).inc();
    }
}

#[inline]
pub fn record_cache_request(resource: &str, outcome: &str) {
    if let Some(c) = get_counter_vec(&CACHE_REQUESTS) {
        c.with_label_values(&[resource, outcome]).inc();
    }
}

#[inline]
pub fn record_cache_fetch_failure(resource: &str) {
    if let Some(c) = get_counter_vec(&CACHE_FETCH_FAILURES) {
        c.with_label_values(&[resource]).inc();
    }
}
