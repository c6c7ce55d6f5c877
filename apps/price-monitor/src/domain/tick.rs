//! Tick payload and per-symbol admission gate.
//!
//! A tick carries the last trade for an instrument plus a sequence
//! marker: the authoritative timestamp of that trade as reported by the
//! upstream feed. A tick only reflects a settled trade when the marker
//! equals the tick's own timestamp; feeds emit intermediate snapshots
//! where the two disagree, and those must never fire a threshold.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::symbol::Symbol;

/// A single market-price observation for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument the tick belongs to.
    pub symbol: Symbol,

    /// Instrument display name as carried by the feed.
    pub name: String,

    /// Last trade price.
    pub price: Decimal,

    /// Cumulative traded volume at this tick.
    pub volume: u64,

    /// Tick timestamp (epoch milliseconds).
    pub timestamp: i64,

    /// Authoritative last-trade timestamp (epoch milliseconds).
    pub sequence_marker: i64,
}

impl Tick {
    /// Build a settled tick: the sequence marker equals the timestamp.
    #[must_use]
    pub fn settled(
        symbol: Symbol,
        name: impl Into<String>,
        price: Decimal,
        volume: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            symbol,
            name: name.into(),
            price,
            volume,
            timestamp,
            sequence_marker: timestamp,
        }
    }

    /// Whether the tick reflects a settled trade.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.sequence_marker == self.timestamp
    }
}

/// Verdict of the admission gate for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAdmission {
    /// The tick is settled and newer than everything seen for its symbol.
    Admitted,
    /// The sequence marker disagrees with the tick timestamp.
    Unsettled,
    /// The marker is not newer than the last accepted one for the symbol.
    Stale,
}

impl TickAdmission {
    /// String representation for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Unsettled => "unsettled",
            Self::Stale => "stale",
        }
    }

    /// Whether the tick passed the gate.
    #[must_use]
    pub const fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Per-symbol admission gate.
///
/// Tracks the newest accepted sequence marker per symbol and rejects
/// anything at or behind it, so a duplicated or re-delivered tick
/// evaluates only once. Markers survive stream close and reopen so
/// replays stay rejected.
#[derive(Debug, Default)]
pub struct SequenceGate {
    last_accepted: Mutex<HashMap<Symbol, i64>>,
}

impl SequenceGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a tick may be evaluated.
    ///
    /// Admission records the tick's marker; rejected ticks leave the
    /// gate untouched.
    pub fn admit(&self, tick: &Tick) -> TickAdmission {
        if !tick.is_settled() {
            return TickAdmission::Unsettled;
        }

        let mut last_accepted = self.last_accepted.lock();
        match last_accepted.get(&tick.symbol) {
            Some(&previous) if tick.sequence_marker <= previous => TickAdmission::Stale,
            _ => {
                last_accepted.insert(tick.symbol.clone(), tick.sequence_marker);
                TickAdmission::Admitted
            }
        }
    }

    /// Last accepted marker for a symbol, if any tick was admitted.
    #[must_use]
    pub fn last_marker(&self, symbol: &Symbol) -> Option<i64> {
        self.last_accepted.lock().get(symbol).copied()
    }

    /// Number of symbols with an accepted marker.
    #[must_use]
    pub fn tracked_symbols(&self) -> usize {
        self.last_accepted.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tick(symbol: &str, timestamp: i64, marker: i64) -> Tick {
        Tick {
            symbol: Symbol::new(symbol),
            name: "TSMC".to_string(),
            price: Decimal::new(600, 0),
            volume: 1000,
            timestamp,
            sequence_marker: marker,
        }
    }

    #[test]
    fn settled_constructor_aligns_marker() {
        let t = Tick::settled(Symbol::new("2330"), "TSMC", Decimal::new(605, 0), 1000, 1_700);
        assert!(t.is_settled());
        assert_eq!(t.sequence_marker, t.timestamp);
    }

    #[test_case(1_000, 1_000, true ; "marker equals timestamp")]
    #[test_case(1_000, 900, false ; "marker behind timestamp")]
    #[test_case(1_000, 1_100, false ; "marker ahead of timestamp")]
    fn tick_is_settled(timestamp: i64, marker: i64, expected: bool) {
        assert_eq!(tick("2330", timestamp, marker).is_settled(), expected);
    }

    #[test]
    fn admission_as_str() {
        assert_eq!(TickAdmission::Admitted.as_str(), "admitted");
        assert_eq!(TickAdmission::Unsettled.as_str(), "unsettled");
        assert_eq!(TickAdmission::Stale.as_str(), "stale");
        assert!(TickAdmission::Admitted.is_admitted());
        assert!(!TickAdmission::Stale.is_admitted());
    }

    #[test]
    fn gate_admits_first_tick() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 1_000, 1_000)), TickAdmission::Admitted);
        assert_eq!(gate.last_marker(&Symbol::new("2330")), Some(1_000));
    }

    #[test]
    fn gate_rejects_unsettled_without_recording() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 1_000, 900)), TickAdmission::Unsettled);
        assert_eq!(gate.last_marker(&Symbol::new("2330")), None);
    }

    #[test]
    fn gate_rejects_duplicate_marker() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 1_000, 1_000)), TickAdmission::Admitted);
        assert_eq!(gate.admit(&tick("2330", 1_000, 1_000)), TickAdmission::Stale);
    }

    #[test]
    fn gate_rejects_older_marker() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 2_000, 2_000)), TickAdmission::Admitted);
        assert_eq!(gate.admit(&tick("2330", 1_500, 1_500)), TickAdmission::Stale);
        assert_eq!(gate.last_marker(&Symbol::new("2330")), Some(2_000));
    }

    #[test]
    fn gate_admits_newer_marker() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 1_000, 1_000)), TickAdmission::Admitted);
        assert_eq!(gate.admit(&tick("2330", 2_000, 2_000)), TickAdmission::Admitted);
        assert_eq!(gate.last_marker(&Symbol::new("2330")), Some(2_000));
    }

    #[test]
    fn gate_tracks_symbols_independently() {
        let gate = SequenceGate::new();
        assert_eq!(gate.admit(&tick("2330", 2_000, 2_000)), TickAdmission::Admitted);

        // An older marker on a different symbol is still fresh.
        assert_eq!(gate.admit(&tick("0050", 1_000, 1_000)), TickAdmission::Admitted);
        assert_eq!(gate.tracked_symbols(), 2);
    }

    #[test]
    fn gate_is_shareable_across_threads() {
        use std::sync::Arc;

        let gate = Arc::new(SequenceGate::new());
        let mut handles = Vec::new();

        for i in 0..8_i64 {
            let gate = Arc::clone(&gate);
            handles.push(std::thread::spawn(move || {
                let marker = 1_000 + i;
                gate.admit(&tick("2330", marker, marker))
            }));
        }

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|a| a.is_admitted())
            .count();

        // At least the highest marker is admitted; every verdict is
        // consistent with a single monotonic sequence.
        assert!(admitted >= 1);
        assert_eq!(gate.last_marker(&Symbol::new("2330")), Some(1_007));
    }

    #[test]
    fn tick_serde_roundtrip() {
        let t = tick("2330", 1_000, 1_000);
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Tick = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
    }
}
