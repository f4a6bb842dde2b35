//! A compact record of everything the host has told the console so far.
//!
//! Decoded SysEx messages are applied here one at a time; the firmware fans the resulting
//! state out to whichever task cares (today that is the note transmitter, which reads the
//! transpose). Fields the firmware does not act on yet are still tracked so they can be
//! reported and so future features find them in place.

use crate::sysex::{SysExEvent, SysExMessage};

/// Console-wide settings accumulated from host SysEx traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsoleState {
    /// Semitone offset applied to every outgoing note. The wire value is reinterpreted as
    /// two's complement, so `0xFFFB` transposes down a fourth.
    pub transpose: i16,
    /// Selected temperament, as a raw host index.
    pub temperament: u16,
    /// Base tuning adjustment, as a raw host value.
    pub tuning: u16,
    /// Selected instrument/sample set.
    pub instrument: u16,
    /// Whether the host has announced it is ready for note traffic.
    pub host_ready: bool,
    /// Host output gain, echoed for display purposes.
    pub gain: u16,
    /// Host polyphony limit, echoed for display purposes.
    pub polyphony: u16,
    /// Whether the host is currently recording the performance.
    pub recording: bool,
}

impl ConsoleState {
    /// Applies one decoded message.
    ///
    /// Returns `true` if the message named a known event and the state absorbed it. Unknown
    /// event codes leave the state untouched and return `false`; the protocol expects newer
    /// hosts to talk past older consoles.
    pub fn apply(&mut self, msg: &SysExMessage) -> bool {
        let Some(event) = msg.event_kind() else {
            return false;
        };

        match event {
            SysExEvent::Transpose => self.transpose = msg.value as i16,
            SysExEvent::Temperament => self.temperament = msg.value,
            SysExEvent::Tuning => self.tuning = msg.value,
            SysExEvent::Instrument => self.instrument = msg.value,
            SysExEvent::HostReady => self.host_ready = true,
            SysExEvent::HostGain => self.gain = msg.value,
            SysExEvent::HostPolyphony => self.polyphony = msg.value,
            SysExEvent::HostStartRecording => self.recording = true,
            SysExEvent::HostStopRecording => self.recording = false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(event: u16, value: u16) -> SysExMessage {
        SysExMessage { event, value }
    }

    #[test]
    fn transpose_is_signed() {
        let mut state = ConsoleState::default();

        assert!(state.apply(&msg(0x01, 0x0005)));
        assert_eq!(5, state.transpose);

        assert!(state.apply(&msg(0x01, 0xFFFB)));
        assert_eq!(-5, state.transpose);
    }

    #[test]
    fn host_session_events_toggle_flags() {
        let mut state = ConsoleState::default();

        assert!(state.apply(&msg(0x100, 0x0000)));
        assert!(state.host_ready);

        assert!(state.apply(&msg(0x141, 0x0000)));
        assert!(state.recording);

        assert!(state.apply(&msg(0x142, 0x0000)));
        assert!(!state.recording);
    }

    #[test]
    fn configuration_events_land_in_their_fields() {
        let mut state = ConsoleState::default();

        state.apply(&msg(0x02, 3));
        state.apply(&msg(0x03, 440));
        state.apply(&msg(0x04, 7));
        state.apply(&msg(0x101, 0x8000));
        state.apply(&msg(0x102, 256));

        let expected = ConsoleState {
            temperament: 3,
            tuning: 440,
            instrument: 7,
            gain: 0x8000,
            polyphony: 256,
            ..ConsoleState::default()
        };
        assert_eq!(expected, state, "Expected left but got right");
    }

    #[test]
    fn unknown_events_leave_state_untouched() {
        let mut state = ConsoleState::default();
        assert!(!state.apply(&msg(0xCAFE, 1)));
        assert_eq!(ConsoleState::default(), state);
    }
}
