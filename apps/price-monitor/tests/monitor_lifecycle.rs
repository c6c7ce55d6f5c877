//! Monitor Lifecycle Integration Tests
//!
//! Tests the full create/update/delete/recover path with the engine
//! wired to in-process adapters, ticks flowing through real pumps.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;

use price_monitor::{
    AlertMessage, AlertNotifier, Direction, InMemoryMonitorStore, InProcessAlertChannel,
    InProcessTickSource, MatchEvaluator, MonitorChange, MonitorConfig, MonitorDraft, MonitorEngine,
    MonitorStore, SubscriptionRegistry, Symbol, ThresholdIndex, Tick,
};

struct Harness {
    engine: MonitorEngine,
    store: Arc<InMemoryMonitorStore>,
    index: Arc<ThresholdIndex>,
    source: Arc<InProcessTickSource>,
    registry: Arc<SubscriptionRegistry>,
    alerts: mpsc::Receiver<AlertMessage>,
}

fn setup_engine() -> Harness {
    let config = MonitorConfig::default();
    let store = Arc::new(InMemoryMonitorStore::new());
    let index = Arc::new(ThresholdIndex::new());
    let source = Arc::new(InProcessTickSource::new(
        config.channels.tick_buffer_capacity,
    ));
    let (channel, alerts) = InProcessAlertChannel::new(config.channels.alert_buffer_capacity);

    let notifier = Arc::new(AlertNotifier::new(Arc::new(channel), store.clone()));
    let evaluator = Arc::new(MatchEvaluator::new(index.clone(), store.clone(), notifier));
    let registry = Arc::new(SubscriptionRegistry::new(source.clone(), evaluator));
    let engine = MonitorEngine::new(store.clone(), index.clone(), registry.clone());

    Harness {
        engine,
        store,
        index,
        source,
        registry,
        alerts,
    }
}

fn make_draft(symbol: &str, direction: Direction, value: i64) -> MonitorDraft {
    MonitorDraft {
        symbol: Symbol::new(symbol),
        direction,
        value: Decimal::new(value, 0),
        title: "breakout".to_string(),
        name: "TSMC".to_string(),
    }
}

fn make_tick(symbol: &str, price: i64, at: i64) -> Tick {
    Tick::settled(Symbol::new(symbol), "TSMC", Decimal::new(price, 0), 2_500, at)
}

async fn next_alert(alerts: &mut mpsc::Receiver<AlertMessage>) -> AlertMessage {
    timeout(Duration::from_millis(500), alerts.recv())
        .await
        .expect("no alert within 500ms")
        .expect("alert channel closed")
}

async fn assert_no_alert(alerts: &mut mpsc::Receiver<AlertMessage>) {
    sleep(Duration::from_millis(50)).await;
    assert!(alerts.try_recv().is_err(), "unexpected alert delivered");
}

// =============================================================================
// Create and Trigger
// =============================================================================

#[tokio::test]
async fn test_create_then_crossing_tick_fires_one_alert() {
    let mut harness = setup_engine();

    let monitor = tokio_test::assert_ok!(
        harness
            .engine
            .create(make_draft("2330", Direction::Above, 600))
            .await
    );
    assert!(harness.source.is_subscribed(&monitor.symbol));

    assert!(harness.source.publish(make_tick("2330", 605, 1_000)).await);

    let alert = next_alert(&mut harness.alerts).await;
    assert_eq!(alert.title, "breakout");
    assert_eq!(alert.symbol.as_str(), "2330");
    assert_eq!(alert.price, Decimal::new(605, 0));
    assert_eq!(alert.volume, 2_500);

    let stored = harness.store.find(&monitor.id).await.unwrap().unwrap();
    assert!(stored.triggered);
    assert_eq!(harness.index.total_stats().entry_count(), 0);

    // Triggering does not release the stream; only delete does.
    assert!(harness.registry.is_open(&monitor.symbol));

    // Later crossings find no armed threshold.
    assert!(harness.source.publish(make_tick("2330", 610, 2_000)).await);
    assert_no_alert(&mut harness.alerts).await;
}

#[tokio::test]
async fn test_alert_message_renders_human_readable_time() {
    let mut harness = setup_engine();
    harness
        .engine
        .create(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();

    harness
        .source
        .publish(make_tick("2330", 605, 1_700_000_000_000))
        .await;

    let alert = next_alert(&mut harness.alerts).await;
    let rendered = alert.render();
    assert!(rendered.starts_with("<<breakout>>\n"));
    assert!(rendered.contains("TSMC (2330)"));
    assert!(rendered.contains("Price: 605"));
    assert!(rendered.contains("Volume: 2500"));
    assert!(rendered.contains("Time: 2023/11/14 22:13:20"));
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_moves_threshold_before_next_tick() {
    let mut harness = setup_engine();
    let monitor = harness
        .engine
        .create(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();

    harness
        .engine
        .update(
            &monitor.id,
            MonitorChange {
                direction: None,
                value: Some(Decimal::new(700, 0)),
                title: None,
            },
        )
        .await
        .unwrap();

    // The old value no longer fires.
    harness.source.publish(make_tick("2330", 650, 1_000)).await;
    assert_no_alert(&mut harness.alerts).await;

    // The new value does.
    harness.source.publish(make_tick("2330", 705, 2_000)).await;
    let alert = next_alert(&mut harness.alerts).await;
    assert_eq!(alert.price, Decimal::new(705, 0));
}

// =============================================================================
// Delete and Refcounts
// =============================================================================

#[tokio::test]
async fn test_delete_stops_alerts_and_closes_stream() {
    let mut harness = setup_engine();
    let monitor = harness
        .engine
        .create(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();

    tokio_test::assert_ok!(harness.engine.delete(&monitor.id).await);
    sleep(Duration::from_millis(20)).await;

    assert!(harness.store.is_empty());
    assert!(!harness.registry.is_open(&monitor.symbol));
    assert!(!harness.source.publish(make_tick("2330", 605, 1_000)).await);
    assert_no_alert(&mut harness.alerts).await;
}

#[tokio::test]
async fn test_monitors_on_one_symbol_share_a_stream() {
    let mut harness = setup_engine();
    let symbol = Symbol::new("2330");

    let first = harness
        .engine
        .create(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();
    let second = harness
        .engine
        .create(make_draft("2330", Direction::Below, 550))
        .await
        .unwrap();
    assert_eq!(harness.source.subscription_count(), 1);
    assert_eq!(harness.registry.holder_count(&symbol), 2);

    // Dropping one monitor keeps the shared stream open.
    harness.engine.delete(&first.id).await.unwrap();
    assert!(harness.registry.is_open(&symbol));
    harness.source.publish(make_tick("2330", 580, 1_000)).await;
    assert_no_alert(&mut harness.alerts).await;

    // Dropping the last one closes it.
    harness.engine.delete(&second.id).await.unwrap();
    sleep(Duration::from_millis(20)).await;
    assert!(!harness.registry.is_open(&symbol));
    assert!(!harness.source.publish(make_tick("2330", 580, 2_000)).await);
}

#[tokio::test]
async fn test_delete_of_monitor_triggered_in_previous_run() {
    let harness = setup_engine();

    // Triggered before a restart: present in the store but never
    // re-armed, so no stream and no index entry exist for it.
    let monitor = harness
        .store
        .insert(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();
    harness.store.mark_triggered(&monitor.id).await.unwrap();

    let removed = harness.engine.delete(&monitor.id).await.unwrap();
    assert!(removed.triggered);
    assert_eq!(harness.registry.open_streams(), 0);
    assert!(harness.store.is_empty());
}

// =============================================================================
// Recovery and Shutdown
// =============================================================================

#[tokio::test]
async fn test_recovery_re_arms_untriggered_monitors() {
    let mut harness = setup_engine();

    let armed = harness
        .store
        .insert(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();
    let fired = harness
        .store
        .insert(make_draft("2317", Direction::Above, 100))
        .await
        .unwrap();
    harness.store.mark_triggered(&fired.id).await.unwrap();

    let count = harness.engine.recover().await.unwrap();
    assert_eq!(count, 1);
    assert!(harness.registry.is_open(&armed.symbol));
    assert!(!harness.registry.is_open(&fired.symbol));

    harness.source.publish(make_tick("2330", 605, 1_000)).await;
    let alert = next_alert(&mut harness.alerts).await;
    assert_eq!(alert.symbol.as_str(), "2330");
}

#[tokio::test]
async fn test_shutdown_closes_every_stream() {
    let harness = setup_engine();
    harness
        .engine
        .create(make_draft("2330", Direction::Above, 600))
        .await
        .unwrap();
    harness
        .engine
        .create(make_draft("2317", Direction::Below, 100))
        .await
        .unwrap();
    assert_eq!(harness.registry.open_streams(), 2);

    harness.engine.shutdown().await;

    assert_eq!(harness.registry.open_streams(), 0);
    assert!(!harness.source.publish(make_tick("2330", 605, 1_000)).await);
}
