//! The USB-MIDI note transmitter: the far side of the scanner's [`NoteTransmitter`] seam.

use crate::{ConsoleSpy, UsbDriver, configuration};
use embassy_usb::class::midi;
use orgelwerk_lib::keyboard::NoteTransmitter;
use wmidi::{MidiMessage, Note, U7};

/// USB-MIDI Code Index Numbers for the two packet shapes this transmitter emits.
const CIN_NOTE_ON: u8 = 0x09;
const CIN_NOTE_OFF: u8 = 0x08;

/// Sends note events to the host as USB-MIDI event packets.
///
/// Key indices are mapped onto the configured compass (lowest note plus index), shifted by
/// whatever transpose the host has requested, and clamped to the MIDI note range. Sending
/// retries until the transport accepts the packet: a dropped note-off would leave a pipe
/// sounding until the organist notices, which is worse than a late one.
pub struct UsbMidiTransmitter {
    sender: midi::Sender<'static, UsbDriver>,
    console: ConsoleSpy<'static>,
}

impl UsbMidiTransmitter {
    /// Constructs a transmitter over the send half of the USB-MIDI class.
    pub fn new(sender: midi::Sender<'static, UsbDriver>, console: ConsoleSpy<'static>) -> Self {
        Self { sender, console }
    }

    fn note_for_key(&mut self, key: u8) -> Note {
        let transpose = self
            .console
            .try_get()
            .map(|state| state.transpose)
            .unwrap_or(0);
        let number = configuration::LOWEST_NOTE as u8 as i16 + i16::from(key) + transpose;
        Note::from_u8_lossy(number.clamp(0, 127) as u8)
    }
}

impl NoteTransmitter for UsbMidiTransmitter {
    async fn transmit(&mut self, key: u8, on: bool) {
        let note = self.note_for_key(key);
        let (cin, msg) = if on {
            (
                CIN_NOTE_ON,
                MidiMessage::NoteOn(configuration::MIDI_CHANNEL, note, U7::MAX),
            )
        } else {
            (
                CIN_NOTE_OFF,
                MidiMessage::NoteOff(configuration::MIDI_CHANNEL, note, U7::MIN),
            )
        };

        let mut packet = [cin, 0, 0, 0];
        // channel voice messages are three bytes, the slice always fits
        msg.copy_to_slice(&mut packet[1..]).unwrap();

        while self.sender.write_packet(&packet).await.is_err() {
            self.sender.wait_connection().await;
        }
    }
}
