//! Monitor aggregate and its create/update payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::symbol::Symbol;

/// Unique identifier for a monitor, assigned by the store at creation.
///
/// Ids order lexically so they can live in ordered sets, which the
/// threshold index relies on for its per-value entry sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(String);

impl MonitorId {
    /// Create an identifier from a string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a new unique identifier using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MonitorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for MonitorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MonitorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Side of the threshold a monitor watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fire when the price reaches or exceeds the threshold.
    Above,
    /// Fire when the price reaches or falls below the threshold.
    Below,
}

impl Direction {
    /// String representation for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }

    /// Whether a threshold at `value` is crossed by a tick at `price`.
    ///
    /// Both bounds are inclusive: an `above` threshold at 100 is crossed
    /// by a tick at exactly 100.
    #[must_use]
    pub fn crossed_by(self, value: Decimal, price: Decimal) -> bool {
        match self {
            Self::Above => value <= price,
            Self::Below => value >= price,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A price threshold watch for a single instrument.
///
/// A monitor is *armed* until its threshold is crossed and the alert is
/// delivered, at which point `triggered` flips to true and the monitor
/// never fires again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    /// Store-assigned identifier.
    pub id: MonitorId,
    /// Instrument being watched.
    pub symbol: Symbol,
    /// Side of the threshold.
    pub direction: Direction,
    /// Threshold price.
    pub value: Decimal,
    /// Whether the alert for this monitor has already been delivered.
    pub triggered: bool,
    /// Free text carried into the alert message.
    pub title: String,
    /// Instrument display name carried into the alert message.
    pub name: String,
}

impl Monitor {
    /// Assemble a monitor from a draft and a store-assigned id.
    ///
    /// New monitors always start untriggered.
    #[must_use]
    pub fn from_draft(id: MonitorId, draft: MonitorDraft) -> Self {
        Self {
            id,
            symbol: draft.symbol,
            direction: draft.direction,
            value: draft.value,
            triggered: false,
            title: draft.title,
            name: draft.name,
        }
    }

    /// Whether the monitor still belongs in the threshold index.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        !self.triggered
    }
}

/// Payload for creating a monitor. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDraft {
    /// Instrument to watch.
    pub symbol: Symbol,
    /// Side of the threshold.
    pub direction: Direction,
    /// Threshold price.
    pub value: Decimal,
    /// Free text carried into the alert message.
    pub title: String,
    /// Instrument display name carried into the alert message.
    pub name: String,
}

/// Partial update applied to an existing monitor.
///
/// The symbol is deliberately absent: moving a monitor to another
/// instrument is a delete plus create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorChange {
    /// New threshold side, if changing.
    pub direction: Option<Direction>,
    /// New threshold price, if changing.
    pub value: Option<Decimal>,
    /// New alert title, if changing.
    pub title: Option<String>,
}

impl MonitorChange {
    /// Whether the change carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.direction.is_none() && self.value.is_none() && self.title.is_none()
    }

    /// Apply the change to a monitor in place.
    pub fn apply_to(&self, monitor: &mut Monitor) {
        if let Some(direction) = self.direction {
            monitor.direction = direction;
        }
        if let Some(value) = self.value {
            monitor.value = value;
        }
        if let Some(title) = &self.title {
            monitor.title = title.clone();
        }
    }
}
