//! Prometheus metrics for chronometer
//!
//! This module provides metrics tracking for:
//! - Ticker: tick count, failures, timers advanced, tick duration
//! - Store: current timer count, operations by kind and outcome
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::sync::OnceLock;

use crate::error::TimerError;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for tick scheduler metrics
struct TickerMetrics {
    ticks: Counter,
    tick_failures: Counter,
    timers_advanced: Counter,
    tick_duration: Histogram,
}

/// Container for store metrics
struct StoreMetrics {
    timers: Gauge,
    operations: CounterVec,
}

static TICKER_METRICS: OnceLock<TickerMetrics> = OnceLock::new();

static STORE_METRICS: OnceLock<StoreMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = chronometer::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let ticker = TickerMetrics {
        ticks: register_counter!("chronometer_ticks_total", "Total number of completed ticks")?,
        tick_failures: register_counter!(
            "chronometer_tick_failures_total",
            "Total number of ticks that failed in the store"
        )?,
        timers_advanced: register_counter!(
            "chronometer_timers_advanced_total",
            "Total number of timer advances across all ticks"
        )?,
        tick_duration: register_histogram!(
            "chronometer_tick_duration_seconds",
            "Time spent applying one tick to the store",
            vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
        )?,
    };

    let store = StoreMetrics {
        timers: register_gauge!("chronometer_timers", "Number of stored timers")?,
        operations: register_counter_vec!(
            "chronometer_timer_operations_total",
            "Timer store operations by kind and outcome",
            &["operation", "outcome"]
        )?,
    };

    TICKER_METRICS.set(ticker).map_err(|_| "Ticker metrics already initialized")?;
    STORE_METRICS.set(store).map_err(|_| "Store metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    TICKER_METRICS.get().is_some() && STORE_METRICS.get().is_some()
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

/// Start timing one tick
pub fn start_tick_timer() -> MetricsTimer {
    match TICKER_METRICS.get() {
        Some(m) => MetricsTimer::new(m.tick_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Record a completed tick
pub fn record_tick(advanced: usize) {
    let Some(m) = TICKER_METRICS.get() else {
        return;
    };

    m.ticks.inc();
    if advanced > 0 {
        m.timers_advanced.inc_by(advanced as f64);
    }
}

/// Record a tick the store rejected
pub fn record_tick_failure() {
    if let Some(m) = TICKER_METRICS.get() {
        m.tick_failures.inc();
    }
}

/// Update the stored timer gauge
pub fn set_timer_count(count: usize) {
    if let Some(m) = STORE_METRICS.get() {
        m.timers.set(count as f64);
    }
}

/// Record the outcome of a store operation
pub fn record_operation<T>(operation: &str, result: &Result<T, TimerError>) {
    let Some(m) = STORE_METRICS.get() else {
        return;
    };

    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.category().as_str(),
    };
    m.operations.with_label_values(&[operation, outcome]).inc();
}

// ============================================================================
// Tests
// ============================================================================
