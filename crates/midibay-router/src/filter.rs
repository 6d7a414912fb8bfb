//! Filter pipeline.
//!
//! A rule set blocks classifiers, optionally restricts traffic to one channel,
//! and optionally rewrites the channel of channel voice messages. Evaluation
//! order is fixed: classifier, channel filter, channel reset.

use crate::{Error, Result};
use midibay_midi::{channel_of, with_channel, Classifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Channel rule values are 1-based; 0 means inactive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRule {
    /// Only pass messages on this channel.
    pub filter: u8,
    /// Rewrite channel voice messages to this channel.
    pub reset: u8,
}

impl ChannelRule {
    pub const INACTIVE: ChannelRule = ChannelRule { filter: 0, reset: 0 };

    pub fn new(filter: u8, reset: u8) -> Result<Self> {
        let rule = Self { filter, reset };
        rule.validate()?;
        Ok(rule)
    }

    pub fn filter(channel: u8) -> Result<Self> {
        Self::new(channel, 0)
    }

    pub fn reset(channel: u8) -> Result<Self> {
        Self::new(0, channel)
    }

    pub fn validate(&self) -> Result<()> {
        for value in [self.filter, self.reset] {
            if value > 16 {
                return Err(Error::InvalidChannel(value));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.filter > 0 || self.reset > 0
    }
}

/// One scope's worth of rules (global, or a single endpoint).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub filter_set: BTreeSet<Classifier>,
    pub channel: ChannelRule,
}

impl RuleSet {
    #[inline]
    pub fn blocks(&self, classifier: Classifier) -> bool {
        self.filter_set.contains(&classifier)
    }

    /// Returns whether the classifier is blocked after the change.
    pub fn set_blocked(&mut self, classifier: Classifier, blocked: bool) -> bool {
        if blocked {
            self.filter_set.insert(classifier);
        } else {
            self.filter_set.remove(&classifier);
        }
        blocked
    }
}

/// Applies one rule set. Returns `true` when the message is filtered.
///
/// May rewrite the channel nibble of `message[0]`. Messages without a channel
/// (system messages, SysEx continuation packets) never match an active channel
/// filter, so they are filtered whenever one is set.
pub fn apply_rules(message: &mut [u8], classifier: Classifier, rules: &RuleSet) -> bool {
    let Some(status) = message.first_mut() else {
        return true;
    };

    if rules.blocks(classifier) {
        return true;
    }

    if rules.channel.filter > 0 && channel_of(*status) != Some(rules.channel.filter - 1) {
        return true;
    }

    if rules.channel.reset > 0 && classifier.is_channel_voice() {
        *status = with_channel(*status, rules.channel.reset - 1);
    }

    false
}

/// Global rules first, then the endpoint's. Once the global rules filter the
/// message the endpoint rules are not evaluated at all.
#[inline]
pub fn apply_layered(
    message: &mut [u8],
    classifier: Classifier,
    global: &RuleSet,
    endpoint: &RuleSet,
) -> bool {
    apply_rules(message, classifier, global) || apply_rules(message, classifier, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocking(classifier: Classifier) -> RuleSet {
        let mut rules = RuleSet::default();
        rules.set_blocked(classifier, true);
        rules
    }

    #[test]
    fn test_classifier_blocked() {
        let rules = blocking(Classifier::CONTROL_CHANGE);
        let mut msg = [0xB3, 1, 2];
        assert!(apply_rules(&mut msg, Classifier::CONTROL_CHANGE, &rules));

        let mut msg = [0x93, 60, 100];
        assert!(!apply_rules(&mut msg, Classifier::NOTE_ON, &rules));
    }

    #[test]
    fn test_channel_filter() {
        let rules = RuleSet {
            channel: ChannelRule::filter(3).unwrap(),
            ..Default::default()
        };
        let mut on_ch3 = [0x92, 60, 100];
        assert!(!apply_rules(&mut on_ch3, Classifier::NOTE_ON, &rules));

        let mut on_ch1 = [0x90, 60, 100];
        assert!(apply_rules(&mut on_ch1, Classifier::NOTE_ON, &rules));

        // No channel, never matches an active channel filter
        let mut clock = [0xF8];
        assert!(apply_rules(&mut clock, Classifier::TIMING_CLOCK, &rules));
    }

    #[test]
    fn test_channel_reset_rewrites_voice_messages_only() {
        let rules = RuleSet {
            channel: ChannelRule::reset(10).unwrap(),
            ..Default::default()
        };
        let mut note = [0x90, 60, 100];
        assert!(!apply_rules(&mut note, Classifier::NOTE_ON, &rules));
        assert_eq!(note, [0x99, 60, 100]);

        // Replaying the reset produces no further change
        assert!(!apply_rules(&mut note, Classifier::NOTE_ON, &rules));
        assert_eq!(note, [0x99, 60, 100]);

        let mut clock = [0xF8];
        assert!(!apply_rules(&mut clock, Classifier::TIMING_CLOCK, &rules));
        assert_eq!(clock, [0xF8]);
    }

    #[test]
    fn test_filter_runs_before_reset() {
        let rules = RuleSet {
            channel: ChannelRule::new(2, 5).unwrap(),
            ..Default::default()
        };
        let mut wrong = [0x90, 60, 100];
        assert!(apply_rules(&mut wrong, Classifier::NOTE_ON, &rules));
        assert_eq!(wrong[0], 0x90);

        let mut right = [0x91, 60, 100];
        assert!(!apply_rules(&mut right, Classifier::NOTE_ON, &rules));
        assert_eq!(right[0], 0x94);
    }

    #[test]
    fn test_global_short_circuits_endpoint_rules() {
        let global = blocking(Classifier::NOTE_ON);
        let endpoint = RuleSet {
            channel: ChannelRule::reset(5).unwrap(),
            ..Default::default()
        };
        let mut msg = [0x90, 60, 100];
        assert!(apply_layered(&mut msg, Classifier::NOTE_ON, &global, &endpoint));
        // The endpoint reset never ran
        assert_eq!(msg[0], 0x90);

        let mut msg = [0xB0, 1, 2];
        assert!(!apply_layered(&mut msg, Classifier::CONTROL_CHANGE, &global, &endpoint));
        assert_eq!(msg[0], 0xB4);
    }

    #[test]
    fn test_invalid_channel_rejected() {
        assert!(matches!(ChannelRule::new(17, 0), Err(Error::InvalidChannel(17))));
        assert!(ChannelRule::new(16, 16).is_ok());
        assert!(!ChannelRule::INACTIVE.is_active());
    }
}
