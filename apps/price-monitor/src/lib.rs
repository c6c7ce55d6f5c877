#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Price Monitor - Threshold Alert Engine
//!
//! An embedded engine that watches live market-price ticks and fires a
//! single notification the first time a price crosses a user-defined
//! threshold. Tick streams are opened per symbol only while at least one
//! monitor watches that symbol, and each threshold fires at most once.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core monitoring state with no async dependencies
//!   - `symbol` / `monitor`: Instrument and monitor value objects
//!   - `tick`: Tick payload and per-symbol admission gate
//!   - `threshold`: Ordered threshold index with atomic claims
//!   - `subscription`: Per-symbol refcount ledger
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for tick streams, monitor storage, alerting
//!   - `services`: Evaluation, notification, subscriptions, lifecycle
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `persistence`: In-memory monitor store
//!   - `stream`: In-process channel-backed tick source
//!   - `alert`: In-process channel-backed alert sink
//!   - `config`: Configuration loading
//!   - `metrics`: Metric registration and recording helpers
//!
//! # Data Flow
//!
//! ```text
//! Tick Source ──► Subscription ──► Match ──► Threshold Index (claim)
//!                   Registry     Evaluator         │
//!                                                  ▼
//!                                              Notifier ──► Alert Channel
//!                                                  │
//!                                                  ▼
//!                                             Monitor Store (triggered)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core monitoring types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::monitor::{Direction, Monitor, MonitorChange, MonitorDraft, MonitorId};
pub use domain::subscription::{AcquireTransition, ReleaseTransition, SubscriptionLedger};
pub use domain::symbol::Symbol;
pub use domain::threshold::{IndexStats, ThresholdIndex, TotalIndexStats};
pub use domain::tick::{SequenceGate, Tick, TickAdmission};

// Ports
pub use application::ports::alert_channel::{AlertChannel, AlertChannelError, AlertMessage};
pub use application::ports::monitor_store::{MonitorStore, MonitorStoreError};
pub use application::ports::tick_source::{
    TickHandler, TickSource, TickSourceError, TickSubscription,
};

// Services
pub use application::services::engine::{EngineError, MonitorEngine};
pub use application::services::evaluator::MatchEvaluator;
pub use application::services::notifier::AlertNotifier;
pub use application::services::registry::SubscriptionRegistry;

// Infrastructure adapters (for hosting and integration tests)
pub use infrastructure::alert::InProcessAlertChannel;
pub use infrastructure::config::{ChannelSettings, MonitorConfig};
pub use infrastructure::metrics::describe_metrics;
pub use infrastructure::persistence::InMemoryMonitorStore;
pub use infrastructure::stream::InProcessTickSource;
