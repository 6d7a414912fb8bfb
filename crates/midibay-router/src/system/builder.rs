//! MidiRouter builder.

use std::sync::Arc;

use crossbeam_channel::bounded;
use parking_lot::Mutex;

use crate::config::RouterConfig;
use crate::event::EventSender;
use crate::state::EngineState;
use crate::Result;

use super::{MidiRouter, RouterInner};

#[derive(Default)]
pub struct MidiRouterBuilder {
    config: RouterConfig,
}

impl MidiRouterBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loop_window_ms(mut self, ms: u64) -> Self {
        self.config.loop_window_ms = ms;
        self
    }

    pub fn clock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.clock_timeout_ms = ms;
        self
    }

    pub fn show_clock(mut self, show: bool) -> Self {
        self.config.show_clock = show;
        self
    }

    pub fn auto_collect_sysex(mut self, enabled: bool) -> Self {
        self.config.auto_collect_sysex = enabled;
        self
    }

    /// `None` lets live SysEx reassembly grow without bound.
    pub fn max_sysex_len(mut self, max: Option<usize>) -> Self {
        self.config.max_sysex_len = max;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn timer_interval_ms(mut self, ms: u64) -> Self {
        self.config.timer_interval_ms = ms;
        self
    }

    pub fn build(self) -> Result<MidiRouter> {
        self.config.validate()?;

        let (tx, events) = bounded(self.config.event_capacity);
        let state = EngineState::new(self.config, EventSender::new(tx));

        Ok(MidiRouter {
            inner: Arc::new(RouterInner {
                state: Mutex::new(state),
                events,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_default_build() {
        let router = MidiRouterBuilder::default().build().unwrap();
        assert!(router.endpoints().is_empty());
        assert_eq!(router.config(), RouterConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let router = MidiRouterBuilder::default()
            .loop_window_ms(25)
            .show_clock(true)
            .max_sysex_len(None)
            .build()
            .unwrap();
        let config = router.config();
        assert_eq!(config.loop_window_ms, 25);
        assert!(config.show_clock);
        assert_eq!(config.max_sysex_len, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = MidiRouterBuilder::default().event_capacity(0).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
