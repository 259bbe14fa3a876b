//! Prometheus metrics for director advertisement
//!
//! This module provides metrics tracking for:
//! - Component health status (mirrors the global [`health`] registry)
//! - Advertisement attempts and their duration, per server type
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

pub mod health;

use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

use self::health::{HealthComponent, HealthLevel};

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all advertisement metrics
struct AdvertiseMetrics {
    component_health: GaugeVec,
    advertise_attempts: CounterVec,
    advertise_duration: HistogramVec,
}

/// Global storage for advertisement metrics
static ADVERTISE_METRICS: OnceLock<AdvertiseMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// Subsequent calls return `Ok(())` without registering anything.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = pelican_advertise::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = AdvertiseMetrics {
        component_health: register_gauge_vec!(
            "pelican_component_health_status",
            "The health status of various server components (1 = critical, 2 = warning, 3 = ok, 4 = unknown)",
            &["component"]
        )?,
        advertise_attempts: register_counter_vec!(
            "pelican_director_advertise_attempts_total",
            "Total advertisement attempts by server type and result",
            &["server_type", "result"]
        )?,
        advertise_duration: register_histogram_vec!(
            "pelican_director_advertise_duration_seconds",
            "Duration of a single server advertisement in seconds",
            &["server_type"],
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    ADVERTISE_METRICS
        .set(metrics)
        .map_err(|_| "Advertise metrics already initialized")?;

    // Catch up with anything written before the gauge existed.
    for (component, status) in health::global().snapshot() {
        set_component_health(component, status.level);
    }

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    ADVERTISE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Mirror a component's health level into the gauge
pub fn set_component_health(component: HealthComponent, level: HealthLevel) {
    if let Some(m) = ADVERTISE_METRICS.get() {
        m.component_health
            .with_label_values(&[component.as_str()])
            .set(level.metric_value());
    }
}

/// Record the outcome of one server advertisement
pub fn record_advertise_attempt(server_type: &str, success: bool) {
    if let Some(m) = ADVERTISE_METRICS.get() {
        let result = if success { "success" } else { "failure" };
        m.advertise_attempts
            .with_label_values(&[server_type, result])
            .inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start an advertisement timer for one server
pub fn start_advertise_timer(server_type: &str) -> MetricsTimer {
    match ADVERTISE_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.advertise_duration
                .with_label_values(&[server_type])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
