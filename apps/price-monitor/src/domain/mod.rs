//! Domain Layer - Core monitoring types and business logic.
//!
//! This layer contains the core domain types for threshold monitoring
//! with no async dependencies. All types here are pure Rust with
//! serialization support where the payload crosses a boundary.

/// Instrument identifier value object.
pub mod symbol;

/// Monitor aggregate and its create/update payloads.
pub mod monitor;

/// Tick payload and per-symbol admission gate.
pub mod tick;

/// Ordered threshold index with atomic claims.
pub mod threshold;

/// Per-symbol subscription refcount ledger.
pub mod subscription;
