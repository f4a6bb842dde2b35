//! Debounced GPIO input for one key contact.

use crate::configuration;
use embassy_stm32::{
    Peri,
    gpio::{AnyPin, Input, Pull},
};
use embassy_time::Instant;
use orgelwerk_lib::keyboard::DebounceChannel;

/// One key contact line with stable-interval debouncing.
///
/// The raw level must sit still for [`DEBOUNCE_INTERVAL`][configuration::DEBOUNCE_INTERVAL]
/// before a change is accepted; every flip inside the window restarts it, so contact chatter
/// never surfaces as an edge.
pub struct BouncedInput {
    input: Input<'static>,
    /// Most recent raw reading, believed or not.
    last_reading: bool,
    /// The debounced level.
    stable: bool,
    /// Direction of the last accepted change, already polarity-corrected.
    edge_was_press: bool,
    last_flip: Instant,
}

impl DebounceChannel for BouncedInput {
    type Pin = Peri<'static, AnyPin>;

    fn setup(pin: Self::Pin) -> Self {
        let input = Input::new(pin, configuration::KEY_PULL);
        let level = input.is_high();
        Self {
            last_reading: level,
            stable: level,
            edge_was_press: false,
            last_flip: Instant::now(),
            input,
        }
    }

    fn update(&mut self) -> bool {
        let reading = self.input.is_high();

        if reading != self.last_reading {
            self.last_reading = reading;
            self.last_flip = Instant::now();
            return false;
        }

        if reading != self.stable && self.last_flip.elapsed() >= configuration::DEBOUNCE_INTERVAL {
            self.stable = reading;
            self.edge_was_press = pressed_level(reading);
            return true;
        }

        false
    }

    fn rose(&self) -> bool {
        self.edge_was_press
    }
}

/// Translates a raw line level into "key is pressed", according to the configured wiring
/// sense. With a pull-up, the contact pulls the line low when the key goes down.
fn pressed_level(level: bool) -> bool {
    match configuration::KEY_PULL {
        Pull::Up => !level,
        Pull::Down | Pull::None => level,
    }
}
