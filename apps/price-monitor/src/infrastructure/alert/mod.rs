//! In-Process Alert Channel
//!
//! A channel-backed implementation of the `AlertChannel` port. The
//! host holds the receiving side and forwards composed alerts to
//! whatever transport it fronts; dropping or closing the receiver
//! makes every send fail, which is how tests exercise the
//! delivery-failure path.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::ports::alert_channel::{AlertChannel, AlertChannelError, AlertMessage};

/// Channel-backed alert sink.
pub struct InProcessAlertChannel {
    tx: mpsc::Sender<AlertMessage>,
}

impl InProcessAlertChannel {
    /// Create a channel holding up to `capacity` undelivered alerts.
    ///
    /// Returns the sending adapter and the receiving side for the
    /// host to drain.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AlertMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertChannel for InProcessAlertChannel {
    async fn send(&self, message: &AlertMessage) -> Result<(), AlertChannelError> {
        self.tx
            .send(message.clone())
            .await
            .map_err(|_| AlertChannelError::Closed)
    }
}
