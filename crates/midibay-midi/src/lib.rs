//! MIDI 1.0 byte-level types for the midibay router.
//!
//! Everything here is pure: classifying a status byte, reading and rewriting the
//! channel nibble, and rendering a message as text for a monitor. No I/O.
//!
//! # Example
//!
//! ```
//! use midibay_midi::{Classifier, describe};
//!
//! let classifier = Classifier::from_status(0x93).unwrap();
//! assert_eq!(classifier, Classifier::NOTE_ON);
//! assert!(describe(&[0x93, 60, 100]).contains("C4"));
//! ```

pub mod status;
pub use status::{channel_of, is_data_byte, with_channel, Classifier};

mod note;
pub use note::note_name;

mod controller;
pub use controller::controller_name;

mod describe;
pub use describe::{describe, hex_bytes};

/// System Exclusive start marker.
pub const SYSEX_START: u8 = 0xF0;
/// System Exclusive end marker.
pub const SYSEX_END: u8 = 0xF7;
