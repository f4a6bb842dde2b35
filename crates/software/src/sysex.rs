//! Decoder for the Johannus/Antonijn SysEx protocol.
//!
//! The host wraps a 24-character ASCII command in a standard SysEx frame: one status byte,
//! the literal `JOHANNUSANTONIJN`, four hex digits of event code, four hex digits of value,
//! and the end-of-exclusive byte. 26 bytes on the wire, always.
//!
//! [`SysExMessage::parse`] is a pure function over a received byte buffer; frame reassembly
//! from USB-MIDI event packets lives in [`SysExAssembler`].

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

mod assembler;
pub use assembler::*;

/// Length of the ASCII command between the two framing bytes.
pub const PAYLOAD_LEN: usize = 24;

/// Every frame opens with this vendor literal.
const VENDOR_TAG: &[u8; 16] = b"JOHANNUSANTONIJN";

/// The commands the protocol defines.
///
/// The first family configures the console itself; the `Host*` family carries acknowledgments
/// and session control from the organ-simulation host (GrandOrgue, in practice). The wire
/// carries a raw 16-bit code, so a frame can name a code outside this enumeration; see
/// [`SysExMessage::event_kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysExEvent {
    /// Shift the whole console by the given number of semitones.
    Transpose = 0x01,
    /// Select a historical temperament.
    Temperament = 0x02,
    /// Adjust the base tuning.
    Tuning = 0x03,
    /// Select the active instrument/sample set.
    Instrument = 0x04,
    /// The host has finished loading and is accepting note traffic.
    HostReady = 0x100,
    /// Host output gain.
    HostGain = 0x101,
    /// Host polyphony limit.
    HostPolyphony = 0x102,
    /// The host started recording the performance.
    HostStartRecording = 0x141,
    /// The host stopped recording the performance.
    HostStopRecording = 0x142,
}

/// A decoded protocol frame: a raw 16-bit event code and its 16-bit value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysExMessage {
    /// The event code, exactly as received. Codes outside [`SysExEvent`] are passed through
    /// undisturbed; deciding what to do with them is the caller's business.
    pub event: u16,
    /// The value associated with the event.
    pub value: u16,
}

impl SysExMessage {
    /// Decodes a raw received SysEx buffer, framing bytes included.
    ///
    /// Returns `None` for anything malformed: wrong total length, wrong vendor literal, or a
    /// non-hex character in either field. A failed parse produces no output at all.
    ///
    /// The length accounting mirrors the protocol definition: the status byte in front and the
    /// end-of-exclusive byte behind are not part of the command, so the usable length is the
    /// buffer length minus two. The subtraction wraps on purpose: a zero- or one-byte buffer
    /// wraps to an enormous count and is rejected by the same comparison as every other wrong
    /// length. That comparison is load-bearing; it is the only thing standing between the wire
    /// and the fixed working buffer below, and it must stay ahead of the copy.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len().wrapping_sub(2) != PAYLOAD_LEN {
            return None;
        }

        let mut command = [0_u8; PAYLOAD_LEN];
        command.copy_from_slice(&data[1..1 + PAYLOAD_LEN]);

        if &command[..VENDOR_TAG.len()] != VENDOR_TAG {
            return None;
        }

        let event = hex_field(&command[16..20])?;
        let value = hex_field(&command[20..24])?;
        Some(Self { event, value })
    }

    /// Maps the raw event code onto the known enumeration, or `None` for codes this firmware
    /// revision does not recognize.
    pub fn event_kind(&self) -> Option<SysExEvent> {
        SysExEvent::from_u16(self.event)
    }
}

/// Parses exactly four ASCII hex digits. Strict: signs, whitespace, and anything else
/// `sscanf`-style scanning would tolerate are rejected.
fn hex_field(digits: &[u8]) -> Option<u16> {
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }

    // all-hexdigit input is valid UTF-8 and fits in 16 bits by construction
    let text = core::str::from_utf8(digits).ok()?;
    u16::from_str_radix(text, 16).ok()
}
