//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `MatchEvaluator`: Per-tick admission, claiming, and dispatch
//! - `AlertNotifier`: Message rendering, delivery, and trigger flagging
//! - `SubscriptionRegistry`: Stream lifecycle driven by refcounts
//! - `MonitorEngine`: Monitor create/update/delete and startup recovery

/// Per-tick evaluation pipeline.
pub mod evaluator;

/// Alert rendering and delivery.
pub mod notifier;

/// Tick stream lifecycle management.
pub mod registry;

/// Monitor lifecycle orchestration.
pub mod engine;
