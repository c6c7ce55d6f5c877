//! Monitor Store Port (Driven Port)
//!
//! Interface for the durable home of monitor definitions. The engine
//! owns no persistence; it drives whatever store the host wires in and
//! re-arms itself from `list_untriggered` at startup.

use async_trait::async_trait;

use crate::domain::monitor::{Monitor, MonitorChange, MonitorDraft, MonitorId};

/// Monitor store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MonitorStoreError {
    /// No monitor exists under the id.
    #[error("monitor not found: {id}")]
    NotFound {
        /// The unknown id.
        id: MonitorId,
    },

    /// The backing store failed.
    #[error("monitor store unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for monitor persistence.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Persist a new monitor. The store assigns the id and the monitor
    /// starts untriggered.
    async fn insert(&self, draft: MonitorDraft) -> Result<Monitor, MonitorStoreError>;

    /// Fetch a monitor by id.
    async fn find(&self, id: &MonitorId) -> Result<Option<Monitor>, MonitorStoreError>;

    /// Apply a partial change and return the updated monitor.
    async fn update(&self, id: &MonitorId, change: MonitorChange)
    -> Result<Monitor, MonitorStoreError>;

    /// Delete a monitor and return its last state.
    async fn remove(&self, id: &MonitorId) -> Result<Monitor, MonitorStoreError>;

    /// Flag a monitor as triggered after successful alert delivery.
    async fn mark_triggered(&self, id: &MonitorId) -> Result<(), MonitorStoreError>;

    /// All monitors whose alert has not fired yet.
    async fn list_untriggered(&self) -> Result<Vec<Monitor>, MonitorStoreError>;
}
