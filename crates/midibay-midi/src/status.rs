//! Status byte classification and channel nibble handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel-independent message category derived from a status byte.
///
/// Channel voice messages (0x80..=0xEF) drop their channel nibble, so every
/// note-on shares `Classifier::NOTE_ON` regardless of channel. System messages
/// (0xF0..=0xFF) are their own classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classifier(u8);

impl Classifier {
    pub const NOTE_OFF: Classifier = Classifier(0x80);
    pub const NOTE_ON: Classifier = Classifier(0x90);
    pub const POLY_AFTERTOUCH: Classifier = Classifier(0xA0);
    pub const CONTROL_CHANGE: Classifier = Classifier(0xB0);
    pub const PROGRAM_CHANGE: Classifier = Classifier(0xC0);
    pub const CHANNEL_PRESSURE: Classifier = Classifier(0xD0);
    pub const PITCH_BEND: Classifier = Classifier(0xE0);
    pub const SYSEX: Classifier = Classifier(0xF0);
    pub const TIME_CODE: Classifier = Classifier(0xF1);
    pub const SONG_POSITION: Classifier = Classifier(0xF2);
    pub const SONG_SELECT: Classifier = Classifier(0xF3);
    pub const TUNE_REQUEST: Classifier = Classifier(0xF6);
    pub const SYSEX_END: Classifier = Classifier(0xF7);
    pub const TIMING_CLOCK: Classifier = Classifier(0xF8);
    pub const START: Classifier = Classifier(0xFA);
    pub const CONTINUE: Classifier = Classifier(0xFB);
    pub const STOP: Classifier = Classifier(0xFC);
    pub const ACTIVE_SENSING: Classifier = Classifier(0xFE);
    pub const SYSTEM_RESET: Classifier = Classifier(0xFF);

    /// Returns `None` for data bytes (high bit clear), which carry no classifier.
    #[inline]
    pub fn from_status(status: u8) -> Option<Self> {
        match status {
            0x00..=0x7F => None,
            0x80..=0xEF => Some(Classifier(status & 0xF0)),
            _ => Some(Classifier(status)),
        }
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self.0
    }

    /// Channel voice messages live below the system-exclusive threshold.
    #[inline]
    pub fn is_channel_voice(self) -> bool {
        self.0 < 0xF0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0x80 => "Note Off",
            0x90 => "Note On",
            0xA0 => "Poly Aftertouch",
            0xB0 => "Control Change",
            0xC0 => "Program Change",
            0xD0 => "Channel Pressure",
            0xE0 => "Pitch Bend",
            0xF0 => "SysEx",
            0xF1 => "Time Code",
            0xF2 => "Song Position",
            0xF3 => "Song Select",
            0xF6 => "Tune Request",
            0xF7 => "SysEx End",
            0xF8 => "Timing Clock",
            0xFA => "Start",
            0xFB => "Continue",
            0xFC => "Stop",
            0xFE => "Active Sensing",
            0xFF => "System Reset",
            _ => "Undefined",
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Classifier> for u8 {
    fn from(classifier: Classifier) -> Self {
        classifier.0
    }
}

/// Zero-based channel of a channel voice status byte, `None` otherwise.
#[inline]
pub fn channel_of(status: u8) -> Option<u8> {
    match status {
        0x80..=0xEF => Some(status & 0x0F),
        _ => None,
    }
}

/// Rewrites the channel nibble. System and data bytes are returned unchanged.
#[inline]
pub fn with_channel(status: u8, channel: u8) -> u8 {
    match status {
        0x80..=0xEF => (status & 0xF0) | (channel & 0x0F),
        _ => status,
    }
}

#[inline]
pub fn is_data_byte(byte: u8) -> bool {
    byte < 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_voice_classifier_strips_channel() {
        assert_eq!(Classifier::from_status(0x90), Some(Classifier::NOTE_ON));
        assert_eq!(Classifier::from_status(0x9F), Some(Classifier::NOTE_ON));
        assert_eq!(Classifier::from_status(0xB3), Some(Classifier::CONTROL_CHANGE));
        assert!(Classifier::NOTE_ON.is_channel_voice());
    }

    #[test]
    fn test_system_classifier_is_identity() {
        assert_eq!(Classifier::from_status(0xF8), Some(Classifier::TIMING_CLOCK));
        assert_eq!(Classifier::from_status(0xF0), Some(Classifier::SYSEX));
        assert!(!Classifier::SYSEX.is_channel_voice());
    }

    #[test]
    fn test_data_byte_has_no_classifier() {
        assert_eq!(Classifier::from_status(0x00), None);
        assert_eq!(Classifier::from_status(0x7F), None);
    }

    #[test]
    fn test_channel_nibble() {
        assert_eq!(channel_of(0x93), Some(3));
        assert_eq!(channel_of(0xF8), None);
        assert_eq!(with_channel(0x93, 9), 0x99);
        assert_eq!(with_channel(0xF8, 9), 0xF8);
        // Rewriting to the same channel is a no-op
        assert_eq!(with_channel(with_channel(0xB0, 4), 4), 0xB4);
    }

    #[test]
    fn test_names() {
        assert_eq!(Classifier::PITCH_BEND.to_string(), "Pitch Bend");
        assert_eq!(Classifier::from_status(0xF4).unwrap().name(), "Undefined");
    }
}
