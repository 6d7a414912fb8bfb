//! Human-readable rendering of raw MIDI messages.

use crate::controller::controller_name;
use crate::note::note_name;
use crate::status::{channel_of, Classifier};

/// Leading SysEx bytes shown before the message is summarized by length.
const SYSEX_PREVIEW: usize = 10;

/// Uppercase two-digit hex, joined with `|`.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join("|")
}

fn raw_suffix(bytes: &[u8]) -> String {
    let data = bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("data:({}) hex:({})", data, hex_bytes(bytes))
}

/// Renders one message for the monitor.
///
/// Channels are shown 1-based. Note messages include the note name, control
/// changes the controller name. Messages that start with a data byte (SysEx
/// continuation packets) render as `--`.
pub fn describe(bytes: &[u8]) -> String {
    let Some(&status) = bytes.first() else {
        return "--".to_string();
    };
    let Some(classifier) = Classifier::from_status(status) else {
        return "--".to_string();
    };

    if let Some(channel) = channel_of(status) {
        let channel = channel + 1;
        let body = match (classifier, bytes.get(1), bytes.get(2)) {
            (Classifier::NOTE_ON | Classifier::NOTE_OFF, Some(&note), Some(&velocity)) => {
                format!("{} {} {}", classifier, note_name(note), velocity)
            }
            (Classifier::CONTROL_CHANGE, Some(&control), Some(&value)) => {
                format!("{} {}", controller_name(control), value)
            }
            (_, Some(&first), Some(&second)) => format!("{} {} {}", classifier, first, second),
            (_, Some(&first), None) => format!("{} {}", classifier, first),
            _ => classifier.to_string(),
        };
        return format!("ch {} {} - {}", channel, body, raw_suffix(bytes));
    }

    if classifier == Classifier::SYSEX {
        if bytes.len() <= SYSEX_PREVIEW {
            return format!("SysEx ({})", hex_bytes(bytes));
        }
        return format!(
            "SysEx ({}|...) {} bytes",
            hex_bytes(&bytes[..SYSEX_PREVIEW]),
            bytes.len()
        );
    }

    format!("\"{}\" - {}", classifier, raw_suffix(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_note_on() {
        let text = describe(&[0x90, 60, 100]);
        assert!(text.starts_with("ch 1 Note On C4 100"));
        assert!(text.ends_with("data:(144,60,100) hex:(90|3C|64)"));
    }

    #[test]
    fn test_describe_control_change() {
        let text = describe(&[0xB2, 7, 127]);
        assert!(text.starts_with("ch 3 Volume 127"));
    }

    #[test]
    fn test_describe_program_change_single_data_byte() {
        let text = describe(&[0xC0, 5]);
        assert!(text.starts_with("ch 1 Program Change 5"));
    }

    #[test]
    fn test_describe_realtime() {
        assert_eq!(describe(&[0xF8]), "\"Timing Clock\" - data:(248) hex:(F8)");
    }

    #[test]
    fn test_describe_sysex_preview() {
        assert_eq!(describe(&[0xF0, 0x43, 0xF7]), "SysEx (F0|43|F7)");

        let long: Vec<u8> = std::iter::once(0xF0)
            .chain(0..20)
            .chain(std::iter::once(0xF7))
            .collect();
        let text = describe(&long);
        assert!(text.ends_with("22 bytes"));
    }

    #[test]
    fn test_describe_data_and_empty() {
        assert_eq!(describe(&[0x10, 0x20]), "--");
        assert_eq!(describe(&[]), "--");
    }
}
