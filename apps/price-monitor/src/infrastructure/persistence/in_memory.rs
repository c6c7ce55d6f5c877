//! In-memory monitor store for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::monitor_store::{MonitorStore, MonitorStoreError};
use crate::domain::monitor::{Monitor, MonitorChange, MonitorDraft, MonitorId};

/// In-memory implementation of `MonitorStore`.
///
/// Suitable for testing and development. Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryMonitorStore {
    monitors: RwLock<HashMap<MonitorId, Monitor>>,
}

impl InMemoryMonitorStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            monitors: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of monitors in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.monitors.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.read().is_empty()
    }

    /// Clear all monitors from the store.
    pub fn clear(&self) {
        self.monitors.write().clear();
    }

    /// Add a monitor under its existing id (for test setup).
    pub fn add(&self, monitor: Monitor) {
        self.monitors.write().insert(monitor.id.clone(), monitor);
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn insert(&self, draft: MonitorDraft) -> Result<Monitor, MonitorStoreError> {
        let monitor = Monitor::from_draft(MonitorId::generate(), draft);
        self.monitors
            .write()
            .insert(monitor.id.clone(), monitor.clone());
        Ok(monitor)
    }

    async fn find(&self, id: &MonitorId) -> Result<Option<Monitor>, MonitorStoreError> {
        Ok(self.monitors.read().get(id).cloned())
    }

    async fn update(
        &self,
        id: &MonitorId,
        change: MonitorChange,
    ) -> Result<Monitor, MonitorStoreError> {
        let mut monitors = self.monitors.write();
        let monitor = monitors
            .get_mut(id)
            .ok_or_else(|| MonitorStoreError::NotFound { id: id.clone() })?;
        change.apply_to(monitor);
        Ok(monitor.clone())
    }

    async fn remove(&self, id: &MonitorId) -> Result<Monitor, MonitorStoreError> {
        self.monitors
            .write()
            .remove(id)
            .ok_or_else(|| MonitorStoreError::NotFound { id: id.clone() })
    }

    async fn mark_triggered(&self, id: &MonitorId) -> Result<(), MonitorStoreError> {
        let mut monitors = self.monitors.write();
        let monitor = monitors
            .get_mut(id)
            .ok_or_else(|| MonitorStoreError::NotFound { id: id.clone() })?;
        monitor.triggered = true;
        Ok(())
    }

    async fn list_untriggered(&self) -> Result<Vec<Monitor>, MonitorStoreError> {
        Ok(self
            .monitors
            .read()
            .values()
            .filter(|monitor| !monitor.triggered)
            .cloned()
            .collect())
    }
}
