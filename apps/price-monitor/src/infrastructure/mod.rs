//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port
//! interfaces defined in the application layer, plus configuration
//! and metric helpers.

/// In-memory monitor store adapter.
pub mod persistence;

/// In-process channel-backed tick source adapter.
pub mod stream;

/// In-process channel-backed alert channel adapter.
pub mod alert;

/// Configuration loading.
pub mod config;

/// Metric registration and recording helpers.
pub mod metrics;
