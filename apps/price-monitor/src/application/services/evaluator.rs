//! Match Evaluator Service
//!
//! The per-tick pipeline: admission gate, claim, resolve, dispatch.
//!
//! Every tick passes the sequence gate first, so unsettled snapshots
//! and re-delivered ticks never reach the index. An admitted tick then
//! claims both directions; each claimed id is resolved against the
//! store and handed to the notifier. Notifications for one tick run
//! concurrently and the evaluator waits for all of them, so a pump
//! cancelled mid-tick still finishes its deliveries.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;

use crate::application::ports::monitor_store::MonitorStore;
use crate::application::ports::tick_source::TickHandler;
use crate::application::services::notifier::AlertNotifier;
use crate::domain::monitor::{Direction, MonitorId};
use crate::domain::threshold::ThresholdIndex;
use crate::domain::tick::{SequenceGate, Tick, TickAdmission};
use crate::infrastructure::metrics::{
    DiscardReason, record_evaluation_duration, record_thresholds_claimed, record_tick_admitted,
    record_tick_discarded, set_armed_thresholds,
};

/// Evaluates admitted ticks against the threshold index.
pub struct MatchEvaluator {
    index: Arc<ThresholdIndex>,
    gate: SequenceGate,
    store: Arc<dyn MonitorStore>,
    notifier: Arc<AlertNotifier>,
}

impl MatchEvaluator {
    /// Create an evaluator over the index, store, and notifier.
    #[must_use]
    pub fn new(
        index: Arc<ThresholdIndex>,
        store: Arc<dyn MonitorStore>,
        notifier: Arc<AlertNotifier>,
    ) -> Self {
        Self {
            index,
            gate: SequenceGate::new(),
            store,
            notifier,
        }
    }

    /// Resolve a claimed id and hand the monitor to the notifier.
    ///
    /// The claim is already consumed, so a monitor that vanished under
    /// a concurrent delete, or a failed lookup, drops the alert.
    async fn dispatch(&self, id: MonitorId, tick: &Tick) {
        match self.store.find(&id).await {
            Ok(Some(monitor)) if monitor.is_armed() => self.notifier.notify(&monitor, tick).await,
            Ok(Some(_)) => {
                tracing::debug!(
                    monitor_id = %id,
                    symbol = %tick.symbol,
                    "Claimed monitor already triggered; alert dropped"
                );
            }
            Ok(None) => {
                tracing::debug!(
                    monitor_id = %id,
                    symbol = %tick.symbol,
                    "Claimed monitor no longer exists; alert dropped"
                );
            }
            Err(error) => {
                tracing::warn!(
                    monitor_id = %id,
                    symbol = %tick.symbol,
                    error = %error,
                    "Monitor lookup failed after claim; alert dropped"
                );
            }
        }
    }
}

#[async_trait]
impl TickHandler for MatchEvaluator {
    async fn on_tick(&self, tick: Tick) {
        match self.gate.admit(&tick) {
            TickAdmission::Admitted => record_tick_admitted(),
            TickAdmission::Unsettled => {
                tracing::debug!(symbol = %tick.symbol, "Tick discarded: unsettled");
                record_tick_discarded(DiscardReason::Unsettled);
                return;
            }
            TickAdmission::Stale => {
                tracing::debug!(
                    symbol = %tick.symbol,
                    marker = tick.sequence_marker,
                    "Tick discarded: stale"
                );
                record_tick_discarded(DiscardReason::Stale);
                return;
            }
        }

        let started = Instant::now();

        let mut claimed = Vec::new();
        for direction in [Direction::Above, Direction::Below] {
            let ids = self.index.claim_crossed(&tick.symbol, direction, tick.price);
            if !ids.is_empty() {
                record_thresholds_claimed(direction, ids.len());
                claimed.extend(ids);
            }
        }

        if !claimed.is_empty() {
            tracing::info!(
                symbol = %tick.symbol,
                price = %tick.price,
                count = claimed.len(),
                "Thresholds crossed"
            );

            join_all(claimed.into_iter().map(|id| self.dispatch(id, &tick))).await;
            set_armed_thresholds(self.index.total_stats().entry_count());
        }

        record_evaluation_duration(started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::domain::monitor::{Monitor, MonitorDraft};
    use crate::domain::symbol::Symbol;
    use crate::infrastructure::alert::InProcessAlertChannel;
    use crate::infrastructure::persistence::InMemoryMonitorStore;
    use tokio::sync::mpsc;

    use crate::application::ports::alert_channel::AlertMessage;

    struct Setup {
        evaluator: MatchEvaluator,
        index: Arc<ThresholdIndex>,
        store: Arc<InMemoryMonitorStore>,
        alerts: mpsc::Receiver<AlertMessage>,
    }

    fn setup() -> Setup {
        let index = Arc::new(ThresholdIndex::new());
        let store = Arc::new(InMemoryMonitorStore::new());
        let (channel, alerts) = InProcessAlertChannel::new(16);
        let notifier = Arc::new(AlertNotifier::new(Arc::new(channel), store.clone()));
        let evaluator = MatchEvaluator::new(index.clone(), store.clone(), notifier);

        Setup {
            evaluator,
            index,
            store,
            alerts,
        }
    }

    async fn armed_monitor(setup: &Setup, direction: Direction, value: i64) -> Monitor {
        let monitor = setup
            .store
            .insert(MonitorDraft {
                symbol: Symbol::new("2330"),
                direction,
                value: Decimal::new(value, 0),
                title: "breakout".to_string(),
                name: "TSMC".to_string(),
            })
            .await
            .unwrap();

        setup.index.insert(
            &monitor.symbol,
            monitor.direction,
            monitor.value,
            monitor.id.clone(),
        );

        monitor
    }

    fn tick_at(price: i64, at: i64) -> Tick {
        Tick::settled(Symbol::new("2330"), "TSMC", Decimal::new(price, 0), 1_000, at)
    }

    #[tokio::test]
    async fn crossing_tick_notifies_and_marks_triggered() {
        let mut setup = setup();
        let monitor = armed_monitor(&setup, Direction::Above, 600).await;

        setup.evaluator.on_tick(tick_at(605, 1_000)).await;

        let alert = setup.alerts.try_recv().unwrap();
        assert_eq!(alert.symbol.as_str(), "2330");
        assert_eq!(alert.price, Decimal::new(605, 0));

        let stored = setup.store.find(&monitor.id).await.unwrap().unwrap();
        assert!(stored.triggered);
        assert!(!setup.index.contains(&monitor.symbol, Direction::Above, &monitor.id));
    }

    #[tokio::test]
    async fn non_crossing_tick_leaves_threshold_armed() {
        let mut setup = setup();
        let monitor = armed_monitor(&setup, Direction::Above, 600).await;

        setup.evaluator.on_tick(tick_at(599, 1_000)).await;

        assert!(setup.alerts.try_recv().is_err());
        assert!(setup.index.contains(&monitor.symbol, Direction::Above, &monitor.id));
        let stored = setup.store.find(&monitor.id).await.unwrap().unwrap();
        assert!(!stored.triggered);
    }

    #[tokio::test]
    async fn duplicate_tick_evaluates_once() {
        let mut setup = setup();
        armed_monitor(&setup, Direction::Above, 600).await;

        setup.evaluator.on_tick(tick_at(605, 1_000)).await;
        setup.evaluator.on_tick(tick_at(605, 1_000)).await;

        assert!(setup.alerts.try_recv().is_ok());
        assert!(setup.alerts.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsettled_tick_is_ignored() {
        let mut setup = setup();
        let monitor = armed_monitor(&setup, Direction::Above, 600).await;

        let mut tick = tick_at(605, 1_000);
        tick.sequence_marker = 900;
        setup.evaluator.on_tick(tick).await;

        assert!(setup.alerts.try_recv().is_err());
        assert!(setup.index.contains(&monitor.symbol, Direction::Above, &monitor.id));
    }

    #[tokio::test]
    async fn stale_tick_cannot_rewind_evaluation() {
        let mut setup = setup();
        setup.evaluator.on_tick(tick_at(700, 2_000)).await;

        // A monitor armed after the fresh tick cannot be claimed by an
        // older replay.
        let monitor = armed_monitor(&setup, Direction::Above, 600).await;
        setup.evaluator.on_tick(tick_at(650, 1_500)).await;

        assert!(setup.alerts.try_recv().is_err());
        assert!(setup.index.contains(&monitor.symbol, Direction::Above, &monitor.id));
    }

    #[tokio::test]
    async fn both_directions_claim_on_one_tick() {
        let mut setup = setup();
        armed_monitor(&setup, Direction::Above, 600).await;
        armed_monitor(&setup, Direction::Below, 610).await;

        setup.evaluator.on_tick(tick_at(605, 1_000)).await;

        assert!(setup.alerts.try_recv().is_ok());
        assert!(setup.alerts.try_recv().is_ok());
        assert_eq!(setup.index.total_stats().entry_count(), 0);
    }

    #[tokio::test]
    async fn claimed_monitor_missing_from_store_drops_alert() {
        let mut setup = setup();

        // Armed in the index but never stored: the delete won the store.
        setup.index.insert(
            &Symbol::new("2330"),
            Direction::Above,
            Decimal::new(600, 0),
            MonitorId::new("mon-gone"),
        );

        setup.evaluator.on_tick(tick_at(605, 1_000)).await;

        assert!(setup.alerts.try_recv().is_err());
        assert_eq!(setup.index.total_stats().entry_count(), 0);
    }

    #[tokio::test]
    async fn failed_delivery_consumes_claim_without_triggering() {
        let mut setup = setup();
        let monitor = armed_monitor(&setup, Direction::Above, 600).await;

        // Closing the receiving side fails every delivery.
        setup.alerts.close();
        setup.evaluator.on_tick(tick_at(605, 1_000)).await;

        let stored = setup.store.find(&monitor.id).await.unwrap().unwrap();
        assert!(!stored.triggered);
        assert!(!setup.index.contains(&monitor.symbol, Direction::Above, &monitor.id));
    }
}
