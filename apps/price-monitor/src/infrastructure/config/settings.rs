//! Monitor Configuration Settings
//!
//! Configuration types for the monitor engine, loaded from environment
//! variables. Every setting has a default, so loading never fails.

/// Channel capacity settings.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Capacity of each per-symbol tick channel.
    pub tick_buffer_capacity: usize,
    /// Capacity of the outgoing alert channel.
    pub alert_buffer_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            tick_buffer_capacity: 256,
            alert_buffer_capacity: 64,
        }
    }
}

/// Complete monitor engine configuration.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Channel capacity settings.
    pub channels: ChannelSettings,
}

impl MonitorConfig {
    /// Create configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let channels = ChannelSettings {
            tick_buffer_capacity: parse_env_usize(
                "PRICE_MONITOR_TICK_BUFFER_CAPACITY",
                ChannelSettings::default().tick_buffer_capacity,
            ),
            alert_buffer_capacity: parse_env_usize(
                "PRICE_MONITOR_ALERT_BUFFER_CAPACITY",
                ChannelSettings::default().alert_buffer_capacity,
            ),
        };

        Self { channels }
    }
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
