//! Tick Source Port (Driven Port)
//!
//! Interface for opening per-symbol tick streams, plus the handler
//! port the engine exposes to the pumps that drain those streams.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::symbol::Symbol;
use crate::domain::tick::Tick;

/// An open tick stream for a single symbol.
///
/// The subscription owns the receiving half of the stream and a
/// cancellation token. Cancelling the token is how the stream is
/// closed: the source observes the cancellation and stops feeding the
/// channel, and the consumer's `recv` drains what is already buffered.
#[derive(Debug)]
pub struct TickSubscription {
    symbol: Symbol,
    receiver: mpsc::Receiver<Tick>,
    cancel: CancellationToken,
}

impl TickSubscription {
    /// Bundle a stream handed out by a tick source.
    #[must_use]
    pub fn new(symbol: Symbol, receiver: mpsc::Receiver<Tick>, cancel: CancellationToken) -> Self {
        Self {
            symbol,
            receiver,
            cancel,
        }
    }

    /// Symbol this subscription covers.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Token that closes the stream when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive the next tick. Returns `None` once the stream is closed
    /// and drained.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.receiver.recv().await
    }
}

/// Tick source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TickSourceError {
    /// The upstream feed cannot open the stream.
    #[error("tick source unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// A live stream for the symbol already exists.
    #[error("already subscribed to {symbol}")]
    AlreadySubscribed {
        /// The symbol with the live stream.
        symbol: String,
    },
}

/// Port for opening per-symbol tick streams.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Open a tick stream for a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream feed is unavailable or the
    /// symbol already has a live stream.
    async fn subscribe(&self, symbol: &Symbol) -> Result<TickSubscription, TickSourceError>;
}

/// Port for consuming ticks (Driver Port).
///
/// Implemented by the match evaluator; driven by the per-symbol pumps.
/// Tick handling never fails upward: every failure mode inside the
/// tick path is logged and absorbed.
#[async_trait]
pub trait TickHandler: Send + Sync {
    /// Evaluate one tick.
    async fn on_tick(&self, tick: Tick);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn subscription_receives_ticks() {
        let (tx, rx) = mpsc::channel(4);
        let mut subscription =
            TickSubscription::new(Symbol::new("2330"), rx, CancellationToken::new());

        let tick = Tick::settled(Symbol::new("2330"), "TSMC", Decimal::new(600, 0), 1000, 1_000);
        tx.send(tick.clone()).await.unwrap();

        assert_eq!(subscription.recv().await, Some(tick));
    }

    #[tokio::test]
    async fn subscription_recv_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel::<Tick>(4);
        let mut subscription =
            TickSubscription::new(Symbol::new("2330"), rx, CancellationToken::new());

        drop(tx);

        assert_eq!(subscription.recv().await, None);
    }

    #[test]
    fn subscription_token_is_shared() {
        let (_tx, rx) = mpsc::channel::<Tick>(4);
        let cancel = CancellationToken::new();
        let subscription = TickSubscription::new(Symbol::new("2330"), rx, cancel.clone());

        subscription.cancellation_token().cancel();

        assert!(cancel.is_cancelled());
        assert_eq!(subscription.symbol().as_str(), "2330");
    }

    #[test]
    fn error_messages() {
        let e = TickSourceError::Unavailable {
            message: "feed down".to_string(),
        };
        assert_eq!(e.to_string(), "tick source unavailable: feed down");

        let e = TickSourceError::AlreadySubscribed {
            symbol: "2330".to_string(),
        };
        assert_eq!(e.to_string(), "already subscribed to 2330");
    }
}
