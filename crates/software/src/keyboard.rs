//! The keyboard scanner: a fixed bank of debounced key contacts polled once per tick, with
//! contact transitions dispatched as note events in key order.
//!
//! The scanner deliberately knows nothing about hardware or transports. Contact filtering is
//! behind [`DebounceChannel`] and the MIDI link is behind [`NoteTransmitter`], so the whole
//! scan-and-dispatch path can be exercised with scripted fakes.

/// A single debounced digital input line, bound to one physical key contact.
///
/// Implementations are expected to normalize polarity: [`rose`][Self::rose] must report a
/// logical press edge regardless of whether the contact is wired active-high or active-low,
/// so the scanner never needs to know the wiring sense.
pub trait DebounceChannel {
    /// Whatever identifies and configures the physical input line (a GPIO peripheral on the
    /// device, a scripted state sequence in tests).
    type Pin;

    /// Binds the channel to its pin and performs any one-time line configuration
    /// (pull direction, debounce interval).
    fn setup(pin: Self::Pin) -> Self;

    /// Polls the line. Returns `true` iff the debounced state changed since the last poll.
    fn update(&mut self) -> bool;

    /// Returns `true` iff the most recent change was a press edge.
    ///
    /// Only meaningful directly after [`update`][Self::update] has reported a change.
    fn rose(&self) -> bool;
}

/// Accepts note events from the scanner and puts them on the wire.
///
/// The transport is allowed to suspend for as long as it likes (the USB implementation waits
/// until the host accepts the packet); the scanner itself never blocks between keys.
#[allow(async_fn_in_trait)]
pub trait NoteTransmitter {
    /// Sends a note-on (`on == true`) or note-off for the given key index.
    async fn transmit(&mut self, key: u8, on: bool);
}

/// A bank of `N` keys, each tracked by one [`DebounceChannel`].
///
/// The key-to-pin mapping is fixed at construction and the bank is never resized, so the whole
/// scanner is a flat, allocation-free value. Key indices double as note offsets: the firmware
/// maps index 0 to its configured lowest note.
pub struct Keyboard<B, const N: usize> {
    channels: [B; N],
    down: [bool; N],
}

impl<B: DebounceChannel, const N: usize> Keyboard<B, N> {
    /// Constructs the bank, binding channel `i` to `pins[i]`.
    ///
    /// The array type makes a mapping of the wrong length unrepresentable. Nothing stops two
    /// keys from sharing a pin; that is the caller's mistake to avoid.
    pub fn new(pins: [B::Pin; N]) -> Self {
        Self {
            channels: pins.map(B::setup),
            down: [false; N],
        }
    }

    /// Polls every channel once, in ascending key order, and dispatches one
    /// [`transmit`][NoteTransmitter::transmit] call per changed channel.
    ///
    /// Keys that report no change produce no traffic. When several keys change within the same
    /// tick their events go out in key order; the scanner has no sub-tick timestamps, so that
    /// is the only order it can promise.
    pub async fn update<T: NoteTransmitter>(&mut self, tx: &mut T) {
        for (key, channel) in self.channels.iter_mut().enumerate() {
            if !channel.update() {
                continue;
            }

            let on = channel.rose();
            self.down[key] = on;
            tx.transmit(key as u8, on).await;
        }
    }

    /// Returns the last debounced state of a key: `true` while it is held down.
    pub fn is_down(&self, key: usize) -> bool {
        self.down[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use tinyvec::ArrayVec;

    /// A contact that replays a per-tick script: `None` means no change this tick,
    /// `Some(true)`/`Some(false)` mean a press/release edge.
    struct ScriptedKey {
        script: &'static [Option<bool>],
        tick: usize,
        edge_was_press: bool,
    }

    impl DebounceChannel for ScriptedKey {
        type Pin = &'static [Option<bool>];

        fn setup(script: Self::Pin) -> Self {
            Self {
                script,
                tick: 0,
                edge_was_press: false,
            }
        }

        fn update(&mut self) -> bool {
            let step = self.script.get(self.tick).copied().flatten();
            self.tick += 1;
            match step {
                Some(press) => {
                    self.edge_was_press = press;
                    true
                }
                None => false,
            }
        }

        fn rose(&self) -> bool {
            self.edge_was_press
        }
    }

    #[derive(Default)]
    struct RecordingTransmitter {
        calls: ArrayVec<[(u8, bool); 16]>,
    }

    impl NoteTransmitter for RecordingTransmitter {
        async fn transmit(&mut self, key: u8, on: bool) {
            self.calls.push((key, on));
        }
    }

    #[test]
    fn quiet_keys_produce_no_traffic() {
        let mut keyboard: Keyboard<ScriptedKey, 3> =
            Keyboard::new([&[None, None][..], &[None, None][..], &[None, None][..]]);
        let mut tx = RecordingTransmitter::default();

        block_on(keyboard.update(&mut tx));
        block_on(keyboard.update(&mut tx));

        assert!(tx.calls.is_empty(), "Expected no transmit calls");
    }

    #[test]
    fn press_and_release_are_each_dispatched_once() {
        let quiet: &'static [Option<bool>] = &[None, None, None, None];
        let played: &'static [Option<bool>] = &[None, Some(true), None, Some(false)];
        let mut keyboard: Keyboard<ScriptedKey, 3> = Keyboard::new([quiet, played, quiet]);
        let mut tx = RecordingTransmitter::default();

        block_on(keyboard.update(&mut tx));
        assert!(tx.calls.is_empty());
        assert!(!keyboard.is_down(1));

        block_on(keyboard.update(&mut tx));
        assert_eq!(&[(1, true)], tx.calls.as_slice(), "Expected left but got right");
        assert!(keyboard.is_down(1));

        block_on(keyboard.update(&mut tx));
        assert_eq!(1, tx.calls.len(), "A held key must not retransmit");
        assert!(keyboard.is_down(1));

        block_on(keyboard.update(&mut tx));
        assert_eq!(
            &[(1, true), (1, false)],
            tx.calls.as_slice(),
            "Expected left but got right"
        );
        assert!(!keyboard.is_down(1));
    }

    #[test]
    fn simultaneous_edges_go_out_in_key_order() {
        let pressed: &'static [Option<bool>] = &[Some(true)];
        let quiet: &'static [Option<bool>] = &[None];
        let mut keyboard: Keyboard<ScriptedKey, 3> = Keyboard::new([pressed, quiet, pressed]);
        let mut tx = RecordingTransmitter::default();

        block_on(keyboard.update(&mut tx));

        assert_eq!(
            &[(0, true), (2, true)],
            tx.calls.as_slice(),
            "Expected left but got right"
        );
    }

    #[test]
    fn chord_state_is_tracked_per_key() {
        let pressed: &'static [Option<bool>] = &[Some(true), Some(false)];
        let held: &'static [Option<bool>] = &[Some(true), None];
        let quiet: &'static [Option<bool>] = &[None, None];
        let mut keyboard: Keyboard<ScriptedKey, 3> = Keyboard::new([pressed, quiet, held]);
        let mut tx = RecordingTransmitter::default();

        block_on(keyboard.update(&mut tx));
        assert!(keyboard.is_down(0));
        assert!(!keyboard.is_down(1));
        assert!(keyboard.is_down(2));

        block_on(keyboard.update(&mut tx));
        assert!(!keyboard.is_down(0));
        assert!(keyboard.is_down(2));
    }
}
