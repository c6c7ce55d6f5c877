//! Monitor Engine Service
//!
//! Lifecycle entry point for monitors: create, update, delete,
//! recovery, and shutdown. Each operation keeps the store, the
//! threshold index, and the subscription registry consistent with one
//! another.
//!
//! An update that changes direction or value re-indexes the monitor,
//! so the index never holds an entry at a value the store no longer
//! carries.

use std::sync::Arc;

use thiserror::Error;

use crate::application::ports::monitor_store::{MonitorStore, MonitorStoreError};
use crate::application::ports::tick_source::TickSourceError;
use crate::application::services::registry::SubscriptionRegistry;
use crate::domain::monitor::{Monitor, MonitorChange, MonitorDraft, MonitorId};
use crate::domain::threshold::ThresholdIndex;

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by monitor lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No monitor exists under the given id.
    #[error("monitor {id} not found")]
    NotFound {
        /// Identifier that failed to resolve.
        id: MonitorId,
    },

    /// The monitor store rejected the operation.
    #[error("monitor store operation failed: {0}")]
    Store(#[from] MonitorStoreError),

    /// The tick source rejected a stream operation.
    #[error("tick stream operation failed: {0}")]
    Stream(#[from] TickSourceError),
}

// ============================================================================
// Monitor Engine
// ============================================================================

/// Coordinates the store, the index, and the registry for one monitor
/// population.
pub struct MonitorEngine {
    store: Arc<dyn MonitorStore>,
    index: Arc<ThresholdIndex>,
    registry: Arc<SubscriptionRegistry>,
}

impl MonitorEngine {
    /// Create an engine over its three collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn MonitorStore>,
        index: Arc<ThresholdIndex>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            store,
            index,
            registry,
        }
    }

    /// Persist a new monitor, arm its threshold, and open its stream.
    ///
    /// # Errors
    ///
    /// Returns a store error when persistence fails, or a stream error
    /// when the upstream subscribe fails. In the latter case the
    /// monitor is stored and armed; the next recovery pass or a later
    /// acquire for the same symbol attaches it to a live stream.
    pub async fn create(&self, draft: MonitorDraft) -> Result<Monitor, EngineError> {
        let monitor = self.store.insert(draft).await?;
        self.index.insert(
            &monitor.symbol,
            monitor.direction,
            monitor.value,
            monitor.id.clone(),
        );
        self.registry.acquire(&monitor.symbol).await?;

        tracing::info!(
            monitor_id = %monitor.id,
            symbol = %monitor.symbol,
            direction = %monitor.direction,
            value = %monitor.value,
            "Monitor created"
        );
        Ok(monitor)
    }

    /// Apply a partial change and move the threshold entry with it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the id does not resolve,
    /// or a store error when the update fails.
    pub async fn update(&self, id: &MonitorId, change: MonitorChange) -> Result<Monitor, EngineError> {
        let previous = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| EngineError::NotFound { id: id.clone() })?;
        let updated = self.store.update(id, change).await?;

        self.index.remove(&previous.symbol, previous.direction, id);
        if updated.is_armed() {
            self.index.insert(
                &updated.symbol,
                updated.direction,
                updated.value,
                updated.id.clone(),
            );
        }

        tracing::info!(
            monitor_id = %updated.id,
            symbol = %updated.symbol,
            direction = %updated.direction,
            value = %updated.value,
            "Monitor updated"
        );
        Ok(updated)
    }

    /// Remove a monitor, disarm its threshold, and release its stream.
    ///
    /// # Errors
    ///
    /// Returns a store error when the monitor cannot be removed.
    pub async fn delete(&self, id: &MonitorId) -> Result<Monitor, EngineError> {
        let monitor = self.store.remove(id).await?;

        if !self.index.remove(&monitor.symbol, monitor.direction, id) {
            tracing::debug!(monitor_id = %id, "No live index entry on delete");
        }
        self.registry.release(&monitor.symbol);

        tracing::info!(
            monitor_id = %monitor.id,
            symbol = %monitor.symbol,
            "Monitor deleted"
        );
        Ok(monitor)
    }

    /// Re-arm every untriggered monitor after a restart.
    ///
    /// Stream open failures are logged per symbol and do not abort the
    /// pass; the affected thresholds stay armed and attach once a
    /// later acquire opens the stream.
    ///
    /// # Errors
    ///
    /// Returns a store error when the untriggered set cannot be read.
    pub async fn recover(&self) -> Result<usize, EngineError> {
        let monitors = self.store.list_untriggered().await?;
        let count = monitors.len();

        for monitor in monitors {
            self.index.insert(
                &monitor.symbol,
                monitor.direction,
                monitor.value,
                monitor.id.clone(),
            );
            if let Err(error) = self.registry.acquire(&monitor.symbol).await {
                tracing::error!(
                    monitor_id = %monitor.id,
                    symbol = %monitor.symbol,
                    error = %error,
                    "Stream open failed during recovery"
                );
            }
        }

        tracing::info!(count, "Monitors re-armed");
        Ok(count)
    }

    /// Stop every tick stream and wait for their pumps to finish.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        tracing::info!("Monitor engine stopped");
    }
}
