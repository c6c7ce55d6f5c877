//! Configuration Module
//!
//! Configuration loading for the monitor engine host.

mod settings;

pub use settings::{ChannelSettings, MonitorConfig};
