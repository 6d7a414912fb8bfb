//! MIDI note names in scientific pitch notation.
//!
//! Middle C (MIDI 60) is `C4`. Concert A (440 Hz, MIDI 69) is `A4`.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octaves run from -1 (MIDI 0) to 9 (MIDI 127).
pub fn note_name(note: u8) -> String {
    let note = note & 0x7F;
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
        assert_eq!(note_name(61), "C#4");
    }
}
