//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TickSource`: Interface for opening per-symbol tick streams
//! - `MonitorStore`: Interface for durable monitor definitions
//! - `AlertChannel`: Interface for delivering rendered alerts
//!
//! ## Driver Ports (Inbound)
//!
//! - `TickHandler`: Interface the engine exposes to tick pumps

/// Tick stream port and the handler the pumps drive.
pub mod tick_source;

/// Monitor storage port.
pub mod monitor_store;

/// Alert delivery port and message rendering.
pub mod alert_channel;
