//! Persistence Adapters
//!
//! Concrete implementations of the `MonitorStore` port.

/// In-memory monitor store.
pub mod in_memory;

pub use in_memory::InMemoryMonitorStore;
