//! Alert Notifier Service
//!
//! Renders and delivers the alert for a claimed monitor, then flags
//! the monitor triggered in the store.
//!
//! Delivery is at-most-once. By the time a monitor reaches the
//! notifier its index entry is already consumed, so a failed delivery
//! is logged and dropped, never retried; the monitor then sits
//! untriggered in the store with no armed threshold, which is the
//! detectable signature operators reconcile from the delivery log.

use std::sync::Arc;

use crate::application::ports::alert_channel::{AlertChannel, AlertMessage};
use crate::application::ports::monitor_store::MonitorStore;
use crate::domain::monitor::Monitor;
use crate::domain::tick::Tick;
use crate::infrastructure::metrics::{FailureStage, record_alert_delivered, record_alert_failed};

/// Delivers alerts and flags triggered monitors.
pub struct AlertNotifier {
    channel: Arc<dyn AlertChannel>,
    store: Arc<dyn MonitorStore>,
}

impl AlertNotifier {
    /// Create a notifier over an alert channel and a monitor store.
    #[must_use]
    pub fn new(channel: Arc<dyn AlertChannel>, store: Arc<dyn MonitorStore>) -> Self {
        Self { channel, store }
    }

    /// Deliver the alert for a claimed monitor.
    ///
    /// On delivery failure the monitor stays unclaimed-but-untriggered;
    /// on success the triggered flag is persisted, and a failure of
    /// that write is logged without undoing the delivery.
    pub async fn notify(&self, monitor: &Monitor, tick: &Tick) {
        let message = AlertMessage::compose(monitor, tick);

        if let Err(error) = self.channel.send(&message).await {
            tracing::error!(
                monitor_id = %monitor.id,
                symbol = %monitor.symbol,
                error = %error,
                "Alert delivery failed; monitor left untriggered"
            );
            record_alert_failed(FailureStage::Delivery);
            return;
        }

        tracing::info!(
            monitor_id = %monitor.id,
            symbol = %monitor.symbol,
            price = %tick.price,
            "Alert delivered"
        );
        record_alert_delivered();

        if let Err(error) = self.store.mark_triggered(&monitor.id).await {
            tracing::warn!(
                monitor_id = %monitor.id,
                error = %error,
                "Alert delivered but triggered flag not persisted"
            );
            record_alert_failed(FailureStage::Persistence);
        }
    }
}
