//! Alert Channel Port (Driven Port)
//!
//! Interface for delivering rendered alerts, plus the message type the
//! notifier composes from a monitor and the tick that crossed it.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::monitor::Monitor;
use crate::domain::symbol::Symbol;
use crate::domain::tick::Tick;

/// A threshold alert ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    /// Monitor title.
    pub title: String,
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Instrument display name.
    pub name: String,
    /// Last trade price that crossed the threshold.
    pub price: Decimal,
    /// Traded volume at the crossing tick.
    pub volume: u64,
    /// Crossing tick timestamp (epoch milliseconds).
    pub timestamp: i64,
}

impl AlertMessage {
    /// Compose the alert for a claimed monitor and the tick that
    /// crossed it.
    ///
    /// The display name stored on the monitor wins; when it is empty
    /// the name carried by the feed fills in.
    #[must_use]
    pub fn compose(monitor: &Monitor, tick: &Tick) -> Self {
        let name = if monitor.name.is_empty() {
            tick.name.clone()
        } else {
            monitor.name.clone()
        };

        Self {
            title: monitor.title.clone(),
            symbol: tick.symbol.clone(),
            name,
            price: tick.price,
            volume: tick.volume,
            timestamp: tick.timestamp,
        }
    }

    /// Human-readable UTC timestamp.
    ///
    /// Falls back to the raw millisecond value when the timestamp is
    /// outside the representable range.
    #[must_use]
    pub fn display_time(&self) -> String {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .map_or_else(
                || self.timestamp.to_string(),
                |at| at.format("%Y/%m/%d %H:%M:%S").to_string(),
            )
    }

    /// Render the delivery body.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<<{}>>\n{} ({})\nPrice: {}\nVolume: {}\nTime: {}",
            self.title,
            self.name,
            self.symbol,
            self.price,
            self.volume,
            self.display_time()
        )
    }
}

/// Alert channel error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AlertChannelError {
    /// The channel no longer accepts messages.
    #[error("alert channel closed")]
    Closed,

    /// The provider rejected or failed the delivery.
    #[error("alert delivery failed: {message}")]
    Delivery {
        /// Error details.
        message: String,
    },
}

/// Port for alert delivery.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be delivered. The
    /// caller treats delivery as at-most-once and never retries.
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertChannelError>;
}
