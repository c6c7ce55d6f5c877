//! Subscription Ledger
//!
//! Domain type for reference-counting symbol interest. Multiple
//! monitors on one symbol share a single upstream tick stream; the
//! ledger reports the 0→1 and 1→0 transitions so the caller knows
//! exactly when to open or close that stream.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::symbol::Symbol;

// =============================================================================
// Transitions
// =============================================================================

/// Outcome of acquiring one reference on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireTransition {
    /// Refcount went 0→1; the upstream stream must be opened.
    Opened,
    /// The symbol already had references; nothing to open.
    AlreadyOpen,
}

/// Outcome of releasing one reference on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTransition {
    /// Refcount went 1→0; the upstream stream must be closed.
    Closed,
    /// Other references remain; the stream stays open.
    StillHeld,
    /// The symbol held no references. Expected when a monitor that
    /// triggered in a previous process life is deleted after restart.
    NotHeld,
}

// =============================================================================
// Subscription Ledger
// =============================================================================

/// Thread-safe per-symbol reference counts.
#[derive(Debug, Default)]
pub struct SubscriptionLedger {
    counts: RwLock<HashMap<Symbol, usize>>,
}

impl SubscriptionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference on a symbol.
    pub fn acquire(&self, symbol: &Symbol) -> AcquireTransition {
        let mut counts = self.counts.write();
        let count = counts.entry(symbol.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            AcquireTransition::Opened
        } else {
            AcquireTransition::AlreadyOpen
        }
    }

    /// Drop one reference on a symbol.
    ///
    /// Releasing a symbol with no references reports `NotHeld` and
    /// leaves the ledger unchanged.
    pub fn release(&self, symbol: &Symbol) -> ReleaseTransition {
        let mut counts = self.counts.write();
        let Some(count) = counts.get_mut(symbol) else {
            return ReleaseTransition::NotHeld;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(symbol);
            ReleaseTransition::Closed
        } else {
            ReleaseTransition::StillHeld
        }
    }

    /// Current refcount for a symbol.
    #[must_use]
    pub fn count(&self, symbol: &Symbol) -> usize {
        self.counts.read().get(symbol).copied().unwrap_or(0)
    }

    /// Whether the symbol holds at least one reference.
    #[must_use]
    pub fn is_active(&self, symbol: &Symbol) -> bool {
        self.count(symbol) > 0
    }

    /// All symbols with active references.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.counts.read().keys().cloned().collect()
    }

    /// Number of symbols with active references.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.counts.read().len()
    }
}

// =============================================================================
// Tests
// =============================================================================
