//! Reassembly of SysEx frames from USB-MIDI event packets.
//!
//! USB-MIDI slices a SysEx frame into 32-bit event packets: a header byte whose low nibble is
//! the Code Index Number, then up to three bytes of frame data. CIN 0x4 carries three bytes of
//! an ongoing frame; CINs 0x5, 0x6, and 0x7 end the frame with one, two, or three final bytes.

use tinyvec::ArrayVec;

/// Default reassembly capacity. The protocol's frames are 26 bytes; the headroom tolerates
/// hosts that pad or chatter without costing more than a cache line.
pub const DEFAULT_FRAME_CAPACITY: usize = 64;

const CIN_SYSEX_CONTINUE: u8 = 0x4;
const CIN_SYSEX_END_1: u8 = 0x5;
const CIN_SYSEX_END_2: u8 = 0x6;
const CIN_SYSEX_END_3: u8 = 0x7;

/// Collects SysEx bytes out of a USB-MIDI packet stream into whole frames.
///
/// Storage is a bounded stack buffer. A frame that outgrows it is poisoned and dropped in one
/// piece once its end packet arrives; the assembler never hands out a truncated frame.
pub struct SysExAssembler<const CAP: usize = DEFAULT_FRAME_CAPACITY> {
    frame: ArrayVec<[u8; CAP]>,
    overflowed: bool,
    complete: bool,
}

impl<const CAP: usize> SysExAssembler<CAP> {
    /// Constructs an empty assembler.
    pub fn new() -> Self {
        Self {
            frame: ArrayVec::new(),
            overflowed: false,
            complete: false,
        }
    }

    /// Feeds one 4-byte USB-MIDI event packet.
    ///
    /// Returns the completed frame (framing bytes included, ready for
    /// [`SysExMessage::parse`][super::SysExMessage::parse]) when this packet ends one, and
    /// `None` otherwise. Packets carrying anything other than SysEx data are ignored.
    pub fn feed(&mut self, packet: &[u8]) -> Option<&[u8]> {
        if self.complete {
            self.frame.clear();
            self.complete = false;
        }

        if packet.len() != 4 {
            return None;
        }

        let data = &packet[1..];
        let taken = match packet[0] & 0x0F {
            CIN_SYSEX_CONTINUE => 3,
            CIN_SYSEX_END_1 => 1,
            CIN_SYSEX_END_2 => 2,
            CIN_SYSEX_END_3 => 3,
            _ => return None,
        };

        for &byte in &data[..taken] {
            if self.frame.try_push(byte).is_some() {
                self.overflowed = true;
            }
        }

        if packet[0] & 0x0F == CIN_SYSEX_CONTINUE {
            return None;
        }

        self.complete = true;
        if self.overflowed {
            self.frame.clear();
            self.overflowed = false;
            return None;
        }

        Some(self.frame.as_slice())
    }
}

impl<const CAP: usize> Default for SysExAssembler<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysex::SysExMessage;

    /// Slices a raw frame into USB-MIDI event packets the way a host's class driver would.
    fn packets(frame: &[u8]) -> impl Iterator<Item = [u8; 4]> + '_ {
        let chunk_cnt = frame.len().div_ceil(3);
        frame.chunks(3).enumerate().map(move |(i, chunk)| {
            let last = i + 1 == chunk_cnt;
            let cin = if last { 0x4 + chunk.len() as u8 } else { 0x4 };
            let mut packet = [cin, 0, 0, 0];
            packet[1..1 + chunk.len()].copy_from_slice(chunk);
            packet
        })
    }

    fn wire_frame() -> [u8; 26] {
        let mut frame = [0_u8; 26];
        frame[0] = 0xF0;
        frame[1..25].copy_from_slice(b"JOHANNUSANTONIJN00010005");
        frame[25] = 0xF7;
        frame
    }

    #[test]
    fn frame_is_rebuilt_across_packets() {
        let frame = wire_frame();
        let mut assembler: SysExAssembler = SysExAssembler::new();

        let mut decoded = None;
        for packet in packets(&frame) {
            if let Some(complete) = assembler.feed(&packet) {
                assert_eq!(None, decoded, "Only one frame expected");
                decoded = SysExMessage::parse(complete);
            }
        }

        assert_eq!(
            Some(SysExMessage {
                event: 0x0001,
                value: 0x0005
            }),
            decoded,
            "Expected left but got right"
        );
    }

    #[test]
    fn back_to_back_frames_do_not_bleed_into_each_other() {
        let frame = wire_frame();
        let mut assembler: SysExAssembler = SysExAssembler::new();

        for _ in 0..2 {
            let mut complete_cnt = 0;
            for packet in packets(&frame) {
                if let Some(complete) = assembler.feed(&packet) {
                    complete_cnt += 1;
                    assert_eq!(frame.as_slice(), complete);
                }
            }
            assert_eq!(1, complete_cnt);
        }
    }

    #[test]
    fn non_sysex_packets_are_ignored() {
        let mut assembler: SysExAssembler = SysExAssembler::new();
        // note-on and note-off event packets
        assert_eq!(None, assembler.feed(&[0x09, 0x90, 60, 0x7F]));
        assert_eq!(None, assembler.feed(&[0x08, 0x80, 60, 0x00]));
        // runt packet
        assert_eq!(None, assembler.feed(&[0x04]));
    }

    #[test]
    fn oversized_frames_are_dropped_whole() {
        let mut assembler: SysExAssembler<8> = SysExAssembler::new();

        for _ in 0..4 {
            assert_eq!(None, assembler.feed(&[0x04, 0x01, 0x02, 0x03]));
        }
        assert_eq!(None, assembler.feed(&[0x05, 0xF7, 0, 0]));

        // the assembler must recover for the next, well-sized frame
        assert_eq!(None, assembler.feed(&[0x04, 0xF0, 0x41, 0x42]));
        let complete = assembler.feed(&[0x06, 0x43, 0xF7, 0]);
        assert_eq!(Some(&[0xF0, 0x41, 0x42, 0x43, 0xF7][..]), complete);
    }
}
