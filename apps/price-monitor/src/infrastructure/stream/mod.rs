//! In-Process Tick Source
//!
//! A channel-backed implementation of the `TickSource` port. Tests and
//! development hosts publish ticks directly; each subscribed symbol
//! gets its own bounded channel so a slow consumer on one symbol never
//! blocks another.
//!
//! An outlet is live until its cancellation token fires or its
//! receiver is dropped. Dead outlets are reaped lazily, so a symbol
//! can be re-subscribed after its stream was closed.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::tick_source::{TickSource, TickSourceError, TickSubscription};
use crate::domain::symbol::Symbol;
use crate::domain::tick::Tick;

/// Sending side of one symbol's tick channel.
struct Outlet {
    tx: mpsc::Sender<Tick>,
    cancel: CancellationToken,
}

impl Outlet {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }
}

/// Channel-backed tick source for tests and development.
pub struct InProcessTickSource {
    capacity: usize,
    outlets: Mutex<HashMap<Symbol, Outlet>>,
}

impl InProcessTickSource {
    /// Create a source whose per-symbol channels hold `capacity` ticks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            outlets: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver a tick to the subscriber of its symbol.
    ///
    /// Returns `false` when no live subscription exists for the
    /// symbol. Delivery waits for channel space, so published ticks
    /// are never silently dropped while the subscriber is alive.
    pub async fn publish(&self, tick: Tick) -> bool {
        let sender = {
            let mut outlets = self.outlets.lock();
            outlets.retain(|_, outlet| outlet.is_live());
            outlets.get(&tick.symbol).map(|outlet| outlet.tx.clone())
        };

        match sender {
            Some(tx) => tx.send(tick).await.is_ok(),
            None => false,
        }
    }

    /// Whether a live subscription exists for the symbol.
    #[must_use]
    pub fn is_subscribed(&self, symbol: &Symbol) -> bool {
        self.outlets
            .lock()
            .get(symbol)
            .is_some_and(Outlet::is_live)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let mut outlets = self.outlets.lock();
        outlets.retain(|_, outlet| outlet.is_live());
        outlets.len()
    }
}

#[async_trait]
impl TickSource for InProcessTickSource {
    async fn subscribe(&self, symbol: &Symbol) -> Result<TickSubscription, TickSourceError> {
        let mut outlets = self.outlets.lock();
        outlets.retain(|_, outlet| outlet.is_live());

        if outlets.contains_key(symbol) {
            return Err(TickSourceError::AlreadySubscribed {
                symbol: symbol.to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        let cancel = CancellationToken::new();
        outlets.insert(
            symbol.clone(),
            Outlet {
                tx,
                cancel: cancel.clone(),
            },
        );

        Ok(TickSubscription::new(symbol.clone(), rx, cancel))
    }
}
