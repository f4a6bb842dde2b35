//! Orgelwerk is [Embassy](https://embassy.dev)-based control firmware for a MIDI organ console
//! keyboard. It scans a bank of mechanical key contacts, debounces them, and sends the
//! resulting note-on/note-off events to an organ-simulation host (typically
//! [GrandOrgue](https://github.com/GrandOrgue/grandorgue)) over USB-MIDI. In the other
//! direction it listens for the Johannus/Antonijn SysEx protocol, through which the host
//! configures the console: transpose, temperament, tuning, instrument selection, and session
//! signals such as recording start/stop.
//!
//! The firmware runs on the [Nucleo-F767ZI development
//! board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html). All decision-making
//! logic lives in `orgelwerk_lib`, where it is tested on the host; this crate wires that logic
//! to GPIO and USB.

#![no_std]
#![no_main]

mod configuration;
mod debounce;
mod transmitter;

use crate::{debounce::BouncedInput, transmitter::UsbMidiTransmitter};
use defmt::{info, panic, unwrap};
use embassy_executor::Spawner;
use embassy_stm32::{
    Config, Peri, bind_interrupts,
    gpio::AnyPin,
    peripherals,
    time::Hertz,
    usb,
};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{AnonReceiver, Sender, Watch},
};
use embassy_time::Ticker;
use embassy_usb::{Builder, UsbDevice, class::midi, driver::EndpointError};
use orgelwerk_lib::{
    console::ConsoleState,
    keyboard::Keyboard,
    sysex::{SysExAssembler, SysExMessage},
};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => usb::InterruptHandler<peripherals::USB_OTG_FS>;
    }
);

type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;

const CONSOLE_RECEIVER_CNT: usize = 0;
type ConsoleSync = Watch<CriticalSectionRawMutex, ConsoleState, CONSOLE_RECEIVER_CNT>;
type ConsoleSender<'a> = Sender<'a, CriticalSectionRawMutex, ConsoleState, CONSOLE_RECEIVER_CNT>;
type ConsoleSpy<'a> = AnonReceiver<'a, CriticalSectionRawMutex, ConsoleState, CONSOLE_RECEIVER_CNT>;

/// Synchronizes host-supplied console settings across tasks.
static CONSOLE_SYNC: ConsoleSync = Watch::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Orgelwerk");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // the Nucleo's 8 MHz ST-LINK MCO feeds HSE
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8MHz / 4 * 216 / 2 = 216MHz sysclk
            // per RM0410 §5.2, USB OTG FS takes its 48MHz clock from PLLQ rather than the bus clocks
            divq: Some(PllQDiv::DIV9), // 8MHz / 4 * 216 / 9 = 48MHz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut config = embassy_stm32::usb::Config::default();

    // CN13 on the Nucleo cannot power the board (UM1974 §6.10), so the device is self-powered
    // and must watch VBUS to notice the host going away.
    config.vbus_detection = true;

    let driver = usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        config,
    );

    // the https://pid.codes vendor ID for FOSS projects
    let vendor_id = 0x1209;
    // "OR" in ASCII, for organ
    let product_id = 0x4F52;

    let mut config = embassy_usb::Config::new(vendor_id, product_id);
    config.manufacturer = Some("Orgelwerk");
    config.product = Some("Orgelwerk Console Keyboard");
    config.self_powered = true;
    config.max_power = 0;

    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    let class = midi::MidiClass::new(&mut builder, 1, 1, 64);
    let (midi_sender, midi_receiver) = class.split();

    let usb = builder.build();
    unwrap!(spawner.spawn(usb_task(usb)));

    let console_sender = CONSOLE_SYNC.sender();
    console_sender.send(ConsoleState::default());
    unwrap!(spawner.spawn(host_task(midi_receiver, console_sender)));

    // logical key index -> physical contact line, key 0 first
    let keys: [Peri<'static, AnyPin>; configuration::NUM_KEYS] = [
        p.PE2.into(),
        p.PE3.into(),
        p.PE4.into(),
        p.PE5.into(),
        p.PE6.into(),
        p.PF0.into(),
        p.PF1.into(),
        p.PF2.into(),
        p.PF3.into(),
        p.PF4.into(),
        p.PF5.into(),
        p.PF6.into(),
        p.PF7.into(),
    ];
    unwrap!(spawner.spawn(scan_task(keys, midi_sender, CONSOLE_SYNC.anon_receiver())));
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

/// Task that scans the key bank and pushes note events to the host.
#[embassy_executor::task]
async fn scan_task(
    keys: [Peri<'static, AnyPin>; configuration::NUM_KEYS],
    sender: midi::Sender<'static, UsbDriver>,
    console: ConsoleSpy<'static>,
) -> ! {
    let mut keyboard: Keyboard<BouncedInput, { configuration::NUM_KEYS }> = Keyboard::new(keys);
    let mut tx = UsbMidiTransmitter::new(sender, console);

    let mut ticker = Ticker::every(configuration::SCAN_TICK);
    loop {
        keyboard.update(&mut tx).await;
        ticker.next().await;
    }
}

/// Task that listens for host SysEx traffic for as long as a host is attached.
#[embassy_executor::task]
async fn host_task(
    mut receiver: midi::Receiver<'static, UsbDriver>,
    console: ConsoleSender<'static>,
) -> ! {
    loop {
        receiver.wait_connection().await;
        info!("USB host connected");
        let _ = process_host_sysex(&mut receiver, &console).await;
        info!("USB host disconnected");
    }
}

/// Reassembles and decodes SysEx frames from the host, folding recognized events into the
/// shared console state. Malformed frames and unknown event codes are logged and discarded;
/// the host gets no reply either way.
async fn process_host_sysex(
    receiver: &mut midi::Receiver<'static, UsbDriver>,
    console: &ConsoleSender<'static>,
) -> Result<(), Disconnected> {
    let mut buf = [0; 64];
    let mut assembler: SysExAssembler = SysExAssembler::new();
    loop {
        let n = receiver.read_packet(&mut buf).await?;
        for packet in buf[..n].chunks(4) {
            let Some(frame) = assembler.feed(packet) else {
                continue;
            };

            let Some(msg) = SysExMessage::parse(frame) else {
                info!("Discarding malformed SysEx frame of {} bytes", frame.len());
                continue;
            };

            let mut state = console
                .try_get()
                .expect("Console state should never be uninitialized");
            if state.apply(&msg) {
                info!(
                    "Host event {=u16:#x} with value {=u16:#x}",
                    msg.event, msg.value
                );
                console.send(state);
            } else {
                info!("Ignoring unrecognized host event {=u16:#x}", msg.event);
            }
        }
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}
