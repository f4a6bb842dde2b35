//! Fixed configuration of the console hardware: how many keys are wired, where the compass
//! starts, and how the contacts behave electrically.
//!
//! The logical-key-to-pin mapping itself is assembled in `main`, because only `main` holds the
//! pin peripherals; everything about that mapping other than the pins lives here.

use embassy_stm32::gpio::Pull;
use embassy_time::Duration;
use wmidi::{Channel, Note};

/// Number of key contacts wired to the board. One octave on the prototype harness; grows with
/// the loom as the console gets wired up.
pub const NUM_KEYS: usize = 13;

/// The note produced by key 0. The prototype octave starts at tenor C.
pub const LOWEST_NOTE: Note = Note::C3;

/// MIDI channel all note traffic goes out on.
pub const MIDI_CHANNEL: Channel = Channel::Ch1;

/// Key contacts switch to ground, so the lines idle high.
pub const KEY_PULL: Pull = Pull::Up;

/// How long a contact must hold a new level before the change is believed. 5 ms rides out the
/// bounce of the console's wire contacts without adding audible latency.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(5);

/// Pause between scan passes over the key bank.
pub const SCAN_TICK: Duration = Duration::from_millis(1);
