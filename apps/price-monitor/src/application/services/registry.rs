//! Subscription Registry Service
//!
//! Owns one tick stream per symbol with at least one interested
//! monitor. Monitors acquire and release interest through the ledger;
//! the first acquire opens the upstream stream and spawns a pump task
//! that forwards ticks to the handler, the last release cancels it.
//! Opens are tracked while in flight, so an acquire that lands mid-open
//! follows that open's outcome instead of trusting the refcount.
//!
//! Release is bookkeeping only. A release that finds no holders is
//! logged and ignored, which happens when a monitor that triggered in
//! a previous run is deleted after a restart.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::tick_source::{
    TickHandler, TickSource, TickSourceError, TickSubscription,
};
use crate::domain::subscription::{ReleaseTransition, SubscriptionLedger};
use crate::domain::symbol::Symbol;
use crate::infrastructure::metrics::set_open_streams;

// ============================================================================
// Stream Slots
// ============================================================================

/// Control handle for one running tick pump.
struct PumpHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Outcome of an upstream open, published to acquires that landed
/// while the subscribe was still in flight.
#[derive(Debug, Clone)]
enum OpenOutcome {
    /// The subscribe has not resolved yet.
    Pending,
    /// The stream is live and its pump is running.
    Opened,
    /// The subscribe failed; every reference taken on this open rolls
    /// back.
    Failed(TickSourceError),
}

/// Per-symbol stream state.
enum StreamSlot {
    /// A subscribe is in flight; followers watch for its outcome.
    Opening(watch::Receiver<OpenOutcome>),
    /// The stream is live.
    Open(PumpHandle),
}

/// What an acquire found when it took its reference.
enum AcquireRole {
    /// The stream is already live.
    Holder,
    /// This acquire opens the stream and publishes the outcome.
    Opener(watch::Sender<OpenOutcome>),
    /// Another acquire is opening; follow its outcome.
    Follower(watch::Receiver<OpenOutcome>),
}

/// Number of live streams in the slot table.
fn live_streams(streams: &HashMap<Symbol, StreamSlot>) -> usize {
    streams
        .values()
        .filter(|slot| matches!(slot, StreamSlot::Open(_)))
        .count()
}

// ============================================================================
// Subscription Registry
// ============================================================================

/// Reference-counted owner of per-symbol tick streams.
pub struct SubscriptionRegistry {
    source: Arc<dyn TickSource>,
    handler: Arc<dyn TickHandler>,
    ledger: SubscriptionLedger,
    streams: Mutex<HashMap<Symbol, StreamSlot>>,
}

impl SubscriptionRegistry {
    /// Create a registry pumping ticks from `source` into `handler`.
    #[must_use]
    pub fn new(source: Arc<dyn TickSource>, handler: Arc<dyn TickHandler>) -> Self {
        Self {
            source,
            handler,
            ledger: SubscriptionLedger::new(),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in a symbol, opening its stream on first use.
    ///
    /// An acquire that lands while another acquire's open is still in
    /// flight shares that open: it returns once the stream is live, or
    /// rolls its reference back and returns the error when the open
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the source error when the upstream subscribe fails;
    /// every reference taken on the strength of that open is rolled
    /// back, so a later acquire retries it.
    pub async fn acquire(&self, symbol: &Symbol) -> Result<(), TickSourceError> {
        // Take the reference and read the symbol's slot under one lock.
        // The slot, not the refcount, decides who opens: a reference
        // taken while an open is in flight follows that open's outcome.
        let role = {
            let mut streams = self.streams.lock();
            self.ledger.acquire(symbol);
            match streams.get(symbol) {
                Some(StreamSlot::Open(_)) => AcquireRole::Holder,
                Some(StreamSlot::Opening(outcome)) => AcquireRole::Follower(outcome.clone()),
                None => {
                    let (publish, outcome) = watch::channel(OpenOutcome::Pending);
                    streams.insert(symbol.clone(), StreamSlot::Opening(outcome));
                    AcquireRole::Opener(publish)
                }
            }
        };

        match role {
            AcquireRole::Holder => {
                tracing::debug!(symbol = %symbol, "Stream already open; interest recorded");
                Ok(())
            }
            AcquireRole::Opener(publish) => self.open_stream(symbol, publish).await,
            AcquireRole::Follower(outcome) => self.follow_open(symbol, outcome).await,
        }
    }

    /// Open the upstream stream and publish the outcome to followers.
    async fn open_stream(
        &self,
        symbol: &Symbol,
        publish: watch::Sender<OpenOutcome>,
    ) -> Result<(), TickSourceError> {
        let subscription = match self.source.subscribe(symbol).await {
            Ok(subscription) => subscription,
            Err(error) => {
                // Withdraw the slot before publishing the failure so an
                // acquire arriving from here on starts a fresh open.
                self.streams.lock().remove(symbol);
                let _ = publish.send(OpenOutcome::Failed(error.clone()));
                self.ledger.release(symbol);
                tracing::error!(symbol = %symbol, error = %error, "Stream open failed");
                return Err(error);
            }
        };

        let cancel = subscription.cancellation_token();
        let task = tokio::spawn(pump(subscription, self.handler.clone()));

        let open = {
            let mut streams = self.streams.lock();
            streams.insert(symbol.clone(), StreamSlot::Open(PumpHandle { cancel, task }));
            live_streams(&streams)
        };
        let _ = publish.send(OpenOutcome::Opened);

        tracing::info!(symbol = %symbol, open_streams = open, "Stream opened");
        set_open_streams(open);
        Ok(())
    }

    /// Wait for an in-flight open and settle this acquire's reference
    /// against its outcome.
    async fn follow_open(
        &self,
        symbol: &Symbol,
        mut outcome: watch::Receiver<OpenOutcome>,
    ) -> Result<(), TickSourceError> {
        let error = loop {
            let current = outcome.borrow_and_update().clone();
            match current {
                OpenOutcome::Opened => {
                    tracing::debug!(symbol = %symbol, "Stream opened by concurrent acquire");
                    return Ok(());
                }
                OpenOutcome::Failed(error) => break error,
                OpenOutcome::Pending => {
                    if outcome.changed().await.is_err() {
                        // The opener went away without publishing. Clear
                        // its slot so the next acquire starts fresh.
                        let mut streams = self.streams.lock();
                        let abandoned = matches!(
                            streams.get(symbol),
                            Some(StreamSlot::Opening(pending)) if pending.same_channel(&outcome)
                        );
                        if abandoned {
                            streams.remove(symbol);
                        }
                        break TickSourceError::Unavailable {
                            message: "stream open abandoned".to_string(),
                        };
                    }
                }
            }
        };

        self.ledger.release(symbol);
        tracing::warn!(symbol = %symbol, error = %error, "Shared stream open failed; interest rolled back");
        Err(error)
    }

    /// Drop one holder of a symbol, closing its stream at zero.
    pub fn release(&self, symbol: &Symbol) {
        let mut streams = self.streams.lock();
        match self.ledger.release(symbol) {
            ReleaseTransition::Closed => {
                let slot = streams.remove(symbol);
                let open = live_streams(&streams);
                drop(streams);

                if let Some(StreamSlot::Open(handle)) = slot {
                    handle.cancel.cancel();
                }
                tracing::info!(symbol = %symbol, open_streams = open, "Stream closed");
                set_open_streams(open);
            }
            ReleaseTransition::StillHeld => {}
            ReleaseTransition::NotHeld => {
                drop(streams);
                tracing::warn!(symbol = %symbol, "Release without matching acquire");
            }
        }
    }

    /// Cancel every pump and wait for all of them to stop.
    pub async fn shutdown(&self) {
        let drained: Vec<PumpHandle> = {
            let mut streams = self.streams.lock();
            streams
                .drain()
                .filter_map(|(_, slot)| match slot {
                    StreamSlot::Open(handle) => Some(handle),
                    StreamSlot::Opening(_) => None,
                })
                .collect()
        };

        for handle in &drained {
            handle.cancel.cancel();
        }

        let count = drained.len();
        for result in join_all(drained.into_iter().map(|handle| handle.task)).await {
            if let Err(error) = result {
                tracing::warn!(error = %error, "Tick pump task failed to join");
            }
        }

        set_open_streams(0);
        tracing::info!(streams = count, "Subscription registry shut down");
    }

    /// Number of streams currently open.
    #[must_use]
    pub fn open_streams(&self) -> usize {
        live_streams(&self.streams.lock())
    }

    /// Whether a stream is open for the symbol.
    #[must_use]
    pub fn is_open(&self, symbol: &Symbol) -> bool {
        matches!(self.streams.lock().get(symbol), Some(StreamSlot::Open(_)))
    }

    /// Number of holders currently registered for the symbol.
    #[must_use]
    pub fn holder_count(&self, symbol: &Symbol) -> usize {
        self.ledger.count(symbol)
    }
}

// ============================================================================
// Tick Pump
// ============================================================================

/// Forward ticks from one subscription into the handler until the
/// stream ends or the subscription is cancelled.
///
/// Cancellation is only observed between ticks, so a tick already
/// handed to the handler always completes.
async fn pump(mut subscription: TickSubscription, handler: Arc<dyn TickHandler>) {
    let cancel = subscription.cancellation_token();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            maybe = subscription.recv() => match maybe {
                Some(tick) => handler.on_tick(tick).await,
                None => break,
            },
        }
    }
    tracing::debug!(symbol = %subscription.symbol(), "Tick pump stopped");
}
