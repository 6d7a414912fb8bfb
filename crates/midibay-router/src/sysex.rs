//! System Exclusive reassembly.
//!
//! Drivers may split one SysEx block over many packets and splice real-time
//! bytes in between. The assembler keeps a single accumulator across packets
//! and hands the block out once the end marker arrives.

use midibay_midi::{is_data_byte, SYSEX_END, SYSEX_START};
use std::mem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysexProgress {
    /// Not part of a block; no state change.
    Ignored,
    Collecting,
    Complete(Vec<u8>),
    /// The block grew past the cap and was discarded.
    Overflow { limit: usize },
}

#[derive(Debug, Default)]
pub struct SysexAssembler {
    collecting: bool,
    accumulator: Vec<u8>,
    pending_notify: bool,
    max_len: Option<usize>,
}

impl SysexAssembler {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            max_len,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn accumulated(&self) -> &[u8] {
        &self.accumulator
    }

    pub fn reset(&mut self) {
        self.collecting = false;
        self.pending_notify = false;
        self.accumulator.clear();
    }

    pub fn feed(&mut self, message: &[u8]) -> SysexProgress {
        let Some(&first) = message.first() else {
            return SysexProgress::Ignored;
        };

        if first == SYSEX_START {
            self.collecting = true;
            self.pending_notify = true;
            self.accumulator.clear();
        } else if !self.collecting {
            return SysexProgress::Ignored;
        }

        let mut local = Vec::with_capacity(message.len());
        for &byte in message {
            match byte {
                SYSEX_START => {
                    local.clear();
                    local.push(byte);
                }
                SYSEX_END => {
                    local.push(byte);
                    break;
                }
                b if is_data_byte(b) => local.push(b),
                // Interleaved real-time or stray status
                _ => {}
            }
        }

        if let Some(limit) = self.max_len {
            if self.accumulator.len() + local.len() > limit {
                tracing::warn!("SysEx block exceeded {} bytes, discarding", limit);
                self.reset();
                return SysexProgress::Overflow { limit };
            }
        }
        self.accumulator.extend_from_slice(&local);

        if message.last() != Some(&SYSEX_END) {
            return SysexProgress::Collecting;
        }

        self.collecting = false;
        if mem::take(&mut self.pending_notify) {
            SysexProgress::Complete(mem::take(&mut self.accumulator))
        } else {
            SysexProgress::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_packet_block() {
        let mut asm = SysexAssembler::new(None);
        let block = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];
        assert_eq!(asm.feed(&block), SysexProgress::Complete(block.to_vec()));
        assert!(!asm.is_collecting());
        assert!(asm.accumulated().is_empty());
    }

    #[test]
    fn test_multi_packet_with_interleaved_clock() {
        let mut asm = SysexAssembler::new(None);
        assert_eq!(asm.feed(&[0xF0, 0x43, 0x10]), SysexProgress::Collecting);
        assert_eq!(asm.feed(&[0x01, 0x02]), SysexProgress::Collecting);
        assert_eq!(asm.feed(&[0xF8]), SysexProgress::Collecting);
        assert_eq!(asm.feed(&[0x03, 0xFE, 0x04]), SysexProgress::Collecting);
        assert_eq!(
            asm.feed(&[0x05, 0xF7]),
            SysexProgress::Complete(vec![0xF0, 0x43, 0x10, 0x01, 0x02, 0x03, 0x04, 0x05, 0xF7])
        );
    }

    #[test]
    fn test_idle_ignores_stray_data() {
        let mut asm = SysexAssembler::new(None);
        assert_eq!(asm.feed(&[0x01, 0x02]), SysexProgress::Ignored);
        assert_eq!(asm.feed(&[0x90, 60, 100]), SysexProgress::Ignored);
        assert_eq!(asm.feed(&[0xF7]), SysexProgress::Ignored);
        assert!(!asm.is_collecting());
    }

    #[test]
    fn test_new_start_marker_resets_accumulator() {
        let mut asm = SysexAssembler::new(None);
        asm.feed(&[0xF0, 0x01, 0x02]);
        asm.feed(&[0xF0, 0x09]);
        assert_eq!(asm.accumulated(), &[0xF0, 0x09]);
    }

    #[test]
    fn test_resync_inside_packet() {
        let mut asm = SysexAssembler::new(None);
        asm.feed(&[0xF0, 0x01]);
        // A start marker mid-packet restarts the packet-local bytes
        let progress = asm.feed(&[0x02, 0xF0, 0x03, 0xF7]);
        assert_eq!(
            progress,
            SysexProgress::Complete(vec![0xF0, 0x01, 0xF0, 0x03, 0xF7])
        );
    }

    #[test]
    fn test_overflow_discards_block() {
        let mut asm = SysexAssembler::new(Some(4));
        assert_eq!(asm.feed(&[0xF0, 0x01]), SysexProgress::Collecting);
        assert_eq!(
            asm.feed(&[0x02, 0x03, 0x04]),
            SysexProgress::Overflow { limit: 4 }
        );
        assert!(!asm.is_collecting());
        assert_eq!(asm.feed(&[0x05, 0xF7]), SysexProgress::Ignored);
    }
}
