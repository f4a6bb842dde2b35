//! This crate contains architecture-agnostic logic for the Orgelwerk, the control firmware of a
//! MIDI organ console keyboard. The device scans a fixed set of mechanical key contacts, turns
//! debounced contact transitions into MIDI note events, and understands the Johannus/Antonijn
//! System Exclusive protocol spoken by organ-simulation hosts such as
//! [GrandOrgue](https://github.com/GrandOrgue/grandorgue).
//!
//! Everything that touches hardware (GPIO, USB) lives in the firmware crate; the seams are the
//! [`DebounceChannel`][keyboard::DebounceChannel] and [`NoteTransmitter`][keyboard::NoteTransmitter]
//! traits, which keeps this crate testable on the host.

#![deny(missing_docs)]
#![no_std]

pub mod console;

pub mod keyboard;

pub mod sysex;
