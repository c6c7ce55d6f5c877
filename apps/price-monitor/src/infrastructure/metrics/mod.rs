//! Metrics Module
//!
//! Emits engine metrics through the `metrics` facade. The engine
//! installs no recorder of its own; the host process wires whichever
//! exporter it runs and calls [`describe_metrics`] once after
//! installing it.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Counts of admitted and discarded ticks
//! - **Claims**: Thresholds claimed per direction
//! - **Alerts**: Delivered and failed alert deliveries
//! - **State**: Open tick streams and armed thresholds

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::domain::monitor::Direction;

// =============================================================================
// Metric Registration
// =============================================================================

/// Describe every metric the engine emits.
///
/// Call once from the host after its metrics recorder is installed.
pub fn describe_metrics() {
    // Tick counters
    describe_counter!(
        "price_monitor_ticks_admitted_total",
        "Total ticks that passed the admission gate"
    );
    describe_counter!(
        "price_monitor_ticks_discarded_total",
        "Total ticks discarded by the admission gate"
    );

    // Claim counters
    describe_counter!(
        "price_monitor_thresholds_claimed_total",
        "Total thresholds claimed by crossing ticks"
    );

    // Alert counters
    describe_counter!(
        "price_monitor_alerts_delivered_total",
        "Total alerts delivered through the alert channel"
    );
    describe_counter!(
        "price_monitor_alerts_failed_total",
        "Total alerts that failed delivery or trigger persistence"
    );

    // State gauges
    describe_gauge!(
        "price_monitor_open_streams",
        "Number of open per-symbol tick streams"
    );
    describe_gauge!(
        "price_monitor_armed_thresholds",
        "Number of armed thresholds in the index"
    );

    // Latency histograms
    describe_histogram!(
        "price_monitor_evaluation_seconds",
        "Time to evaluate one admitted tick through claim and dispatch"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for discarded ticks.
#[derive(Debug, Clone, Copy)]
pub enum DiscardReason {
    /// Sequence marker disagreed with the tick timestamp.
    Unsettled,
    /// Marker not newer than the last accepted one.
    Stale,
}

impl DiscardReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unsettled => "unsettled",
            Self::Stale => "stale",
        }
    }
}

/// Metric labels for failed alerts.
#[derive(Debug, Clone, Copy)]
pub enum FailureStage {
    /// The alert channel rejected or failed the delivery.
    Delivery,
    /// Delivery succeeded but the triggered flag was not persisted.
    Persistence,
}

impl FailureStage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Persistence => "persistence",
        }
    }
}

/// Record a tick that passed the admission gate.
pub fn record_tick_admitted() {
    counter!("price_monitor_ticks_admitted_total").increment(1);
}

/// Record a tick discarded by the admission gate.
pub fn record_tick_discarded(reason: DiscardReason) {
    counter!(
        "price_monitor_ticks_discarded_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record thresholds claimed by a crossing tick.
pub fn record_thresholds_claimed(direction: Direction, count: usize) {
    counter!(
        "price_monitor_thresholds_claimed_total",
        "direction" => direction.as_str()
    )
    .increment(count as u64);
}

/// Record a delivered alert.
pub fn record_alert_delivered() {
    counter!("price_monitor_alerts_delivered_total").increment(1);
}

/// Record a failed alert.
pub fn record_alert_failed(stage: FailureStage) {
    counter!(
        "price_monitor_alerts_failed_total",
        "stage" => stage.as_str()
    )
    .increment(1);
}

/// Update the open tick stream count.
pub fn set_open_streams(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("price_monitor_open_streams").set(count as f64);
}

/// Update the armed threshold count.
pub fn set_armed_thresholds(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("price_monitor_armed_thresholds").set(count as f64);
}

/// Record the evaluation duration for one admitted tick.
pub fn record_evaluation_duration(duration: Duration) {
    histogram!("price_monitor_evaluation_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
