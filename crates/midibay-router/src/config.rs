//! Router configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the dispatch path.
///
/// Deserializes with every field optional; missing fields take the defaults
/// below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Identical 3-byte payloads closer than this are treated as a feedback loop.
    pub loop_window_ms: u64,
    /// Minimum spacing between loop warnings for one output.
    pub loop_warning_interval_ms: u64,
    /// A clock source that stays silent this long is no longer considered live.
    pub clock_timeout_ms: u64,
    /// Surface every Nth timing clock while clock traffic is shown.
    pub clock_display_every: u32,
    /// Surface every Nth active sensing while clock traffic is shown.
    pub active_sensing_display_every: u32,
    /// Initial state of the "show clock traffic" toggle.
    pub show_clock: bool,
    pub auto_collect_sysex: bool,
    /// Cap for live SysEx reassembly. `None` accumulates without bound.
    pub max_sysex_len: Option<usize>,
    /// Capacity of the visibility event channel.
    pub event_capacity: usize,
    /// Polling period of the liveness timer thread.
    pub timer_interval_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            loop_window_ms: 10,
            loop_warning_interval_ms: 1000,
            clock_timeout_ms: 1000,
            clock_display_every: 80,
            active_sensing_display_every: 6,
            show_clock: false,
            auto_collect_sysex: true,
            max_sysex_len: Some(1024 * 1024),
            event_capacity: 1024,
            timer_interval_ms: 250,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("loop_window_ms", self.loop_window_ms),
            ("loop_warning_interval_ms", self.loop_warning_interval_ms),
            ("clock_timeout_ms", self.clock_timeout_ms),
            ("timer_interval_ms", self.timer_interval_ms),
        ];
        for (field, value) in windows {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be non-zero", field)));
            }
        }
        if self.clock_display_every == 0 || self.active_sensing_display_every == 0 {
            return Err(Error::InvalidConfig(
                "display throttles must be non-zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig(
                "event_capacity must be non-zero".to_string(),
            ));
        }
        if self.max_sysex_len == Some(0) {
            return Err(Error::InvalidConfig(
                "max_sysex_len must be non-zero (use None for unbounded)".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn loop_window(&self) -> Duration {
        Duration::from_millis(self.loop_window_ms)
    }

    #[inline]
    pub fn loop_warning_interval(&self) -> Duration {
        Duration::from_millis(self.loop_warning_interval_ms)
    }

    #[inline]
    pub fn clock_timeout(&self) -> Duration {
        Duration::from_millis(self.clock_timeout_ms)
    }

    #[inline]
    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.loop_window(), Duration::from_millis(10));
        assert_eq!(config.clock_display_every, 80);
        assert_eq!(config.active_sensing_display_every, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = RouterConfig {
            loop_window_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = RouterConfig {
            clock_display_every: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RouterConfig {
            max_sysex_len: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RouterConfig {
            max_sysex_len: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
