//! Threshold Index
//!
//! Domain types for tracking armed price thresholds per instrument and
//! direction, and for claiming the thresholds a tick crosses.
//!
//! # Design
//!
//! The index keeps one ordered book per (symbol, direction):
//! - An ordered map from threshold value to the monitor ids armed at
//!   that value, so a claim is a single range scan.
//! - A reverse map from monitor id to its current value, so a monitor
//!   never holds more than one live entry.
//!
//! A claim removes and returns every crossed entry under one write
//! lock, which is what makes delivery at-most-once: concurrent ticks
//! and deletes race for the same entries, and exactly one caller wins
//! each entry while the others observe a no-op.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::monitor::{Direction, MonitorId};
use crate::domain::symbol::Symbol;

// =============================================================================
// Level Book (per symbol and direction)
// =============================================================================

/// Armed thresholds for a single (symbol, direction) pair.
#[derive(Debug, Default)]
struct LevelBook {
    /// Ordered map from threshold value to the monitors armed at it.
    by_value: BTreeMap<Decimal, BTreeSet<MonitorId>>,
    /// Map from monitor id to its current threshold value.
    by_monitor: HashMap<MonitorId, Decimal>,
}

impl LevelBook {
    /// Arm a monitor at a value.
    ///
    /// Returns whether the book changed. Re-arming at the same value is
    /// a no-op; re-arming at a different value moves the single live
    /// entry to the new value.
    fn insert(&mut self, value: Decimal, id: MonitorId) -> bool {
        match self.by_monitor.get(&id) {
            Some(&current) if current == value => false,
            Some(&current) => {
                self.detach(current, &id);
                self.by_value.entry(value).or_default().insert(id.clone());
                self.by_monitor.insert(id, value);
                true
            }
            None => {
                self.by_value.entry(value).or_default().insert(id.clone());
                self.by_monitor.insert(id, value);
                true
            }
        }
    }

    /// Disarm a monitor.
    ///
    /// Returns whether an entry was removed.
    fn remove(&mut self, id: &MonitorId) -> bool {
        self.by_monitor.remove(id).is_some_and(|value| {
            self.detach(value, id);
            true
        })
    }

    /// Remove and return every monitor armed at or below `price`.
    fn claim_at_most(&mut self, price: Decimal) -> Vec<MonitorId> {
        let crossed: Vec<Decimal> = self.by_value.range(..=price).map(|(v, _)| *v).collect();
        self.drain_values(&crossed)
    }

    /// Remove and return every monitor armed at or above `price`.
    fn claim_at_least(&mut self, price: Decimal) -> Vec<MonitorId> {
        let crossed: Vec<Decimal> = self.by_value.range(price..).map(|(v, _)| *v).collect();
        self.drain_values(&crossed)
    }

    fn drain_values(&mut self, values: &[Decimal]) -> Vec<MonitorId> {
        let mut claimed = Vec::new();
        for value in values {
            if let Some(ids) = self.by_value.remove(value) {
                for id in ids {
                    self.by_monitor.remove(&id);
                    claimed.push(id);
                }
            }
        }
        claimed
    }

    fn detach(&mut self, value: Decimal, id: &MonitorId) {
        if let Some(ids) = self.by_value.get_mut(&value) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_value.remove(&value);
            }
        }
    }

    fn value_of(&self, id: &MonitorId) -> Option<Decimal> {
        self.by_monitor.get(id).copied()
    }

    fn len(&self) -> usize {
        self.by_monitor.len()
    }

    fn is_empty(&self) -> bool {
        self.by_monitor.is_empty()
    }
}

// =============================================================================
// Threshold Index
// =============================================================================

/// Thread-safe index of armed thresholds across all instruments.
///
/// # Example
///
/// ```rust
/// use price_monitor::domain::monitor::{Direction, MonitorId};
/// use price_monitor::domain::symbol::Symbol;
/// use price_monitor::domain::threshold::ThresholdIndex;
/// use rust_decimal::Decimal;
///
/// let index = ThresholdIndex::new();
/// let symbol = Symbol::new("2330");
///
/// assert!(index.insert(&symbol, Direction::Above, Decimal::new(600, 0), MonitorId::new("mon-1")));
///
/// // A tick at 605 claims the threshold and consumes the entry.
/// let claimed = index.claim_crossed(&symbol, Direction::Above, Decimal::new(605, 0));
/// assert_eq!(claimed, vec![MonitorId::new("mon-1")]);
///
/// // The claim is consuming: a later tick finds nothing.
/// let again = index.claim_crossed(&symbol, Direction::Above, Decimal::new(610, 0));
/// assert!(again.is_empty());
/// ```
pub struct ThresholdIndex {
    above: RwLock<HashMap<Symbol, LevelBook>>,
    below: RwLock<HashMap<Symbol, LevelBook>>,
}

impl Default for ThresholdIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            above: RwLock::new(HashMap::new()),
            below: RwLock::new(HashMap::new()),
        }
    }

    /// Arm a monitor's threshold.
    ///
    /// Idempotent: re-inserting an id at its current value changes
    /// nothing, and re-inserting at a new value replaces the old entry
    /// so the id keeps a single live entry. Returns whether the index
    /// changed.
    pub fn insert(&self, symbol: &Symbol, direction: Direction, value: Decimal, id: MonitorId) -> bool {
        let mut side = self.side(direction).write();
        side.entry(symbol.clone()).or_default().insert(value, id)
    }

    /// Disarm a monitor's threshold.
    ///
    /// Returns false without complaint when the entry is absent; the
    /// entry may already have been claimed by a tick.
    pub fn remove(&self, symbol: &Symbol, direction: Direction, id: &MonitorId) -> bool {
        let mut side = self.side(direction).write();
        let Some(book) = side.get_mut(symbol) else {
            return false;
        };
        let removed = book.remove(id);
        if book.is_empty() {
            side.remove(symbol);
        }
        removed
    }

    /// Atomically remove and return every threshold crossed by `price`.
    ///
    /// For `above`, entries with value at or below the price; for
    /// `below`, entries with value at or above it. Both bounds are
    /// inclusive. Each entry is returned by exactly one caller.
    pub fn claim_crossed(
        &self,
        symbol: &Symbol,
        direction: Direction,
        price: Decimal,
    ) -> Vec<MonitorId> {
        let mut side = self.side(direction).write();
        let Some(book) = side.get_mut(symbol) else {
            return Vec::new();
        };
        let claimed = match direction {
            Direction::Above => book.claim_at_most(price),
            Direction::Below => book.claim_at_least(price),
        };
        if book.is_empty() {
            side.remove(symbol);
        }
        claimed
    }

    /// Current threshold value for an armed monitor, if indexed.
    #[must_use]
    pub fn threshold_of(&self, symbol: &Symbol, direction: Direction, id: &MonitorId) -> Option<Decimal> {
        self.side(direction)
            .read()
            .get(symbol)
            .and_then(|book| book.value_of(id))
    }

    /// Whether a monitor currently holds a live entry.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol, direction: Direction, id: &MonitorId) -> bool {
        self.threshold_of(symbol, direction, id).is_some()
    }

    /// Statistics for one direction.
    #[must_use]
    pub fn stats(&self, direction: Direction) -> IndexStats {
        let side = self.side(direction).read();
        IndexStats {
            symbol_count: side.len(),
            entry_count: side.values().map(LevelBook::len).sum(),
        }
    }

    /// Statistics across both directions.
    #[must_use]
    pub fn total_stats(&self) -> TotalIndexStats {
        TotalIndexStats {
            above: self.stats(Direction::Above),
            below: self.stats(Direction::Below),
        }
    }

    /// Get the book map for a direction.
    const fn side(&self, direction: Direction) -> &RwLock<HashMap<Symbol, LevelBook>> {
        match direction {
            Direction::Above => &self.above,
            Direction::Below => &self.below,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Statistics for one direction of the index.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of symbols with at least one armed threshold.
    pub symbol_count: usize,
    /// Number of armed thresholds.
    pub entry_count: usize,
}

/// Statistics across both directions.
#[derive(Debug, Clone, Default)]
pub struct TotalIndexStats {
    /// Above-threshold stats.
    pub above: IndexStats,
    /// Below-threshold stats.
    pub below: IndexStats,
}

impl TotalIndexStats {
    /// Total number of armed thresholds.
    #[must_use]
    pub const fn entry_count(&self) -> usize {
        self.above.entry_count + self.below.entry_count
    }
}

// =============================================================================
// Tests
// =============================================================================
