//! kbreport firmware - nRF52840 keyboard with precision touchpad.
//!
//! Task layout:
//!
//! - `usb_task`: USB enumeration and control requests (feature reports)
//! - `hid_writer`: drains the report channel into the HID endpoints
//! - `key`: one per switch, feeds the engine and queues reports
//! - `trackpad`: the trackpad worker
//! - `trackpad_tick`: periodic aggregation tick
//!
//! Build: `cargo build --release --features embedded`

#![no_std]
#![no_main]

mod keys;
mod usb;

use defmt::info;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Ticker};
use kbreport::config::TRACKPAD_TICK_MS;
use kbreport::hid::consumer::ConsumerUsage;
use kbreport::trackpad::NoSensor;
use kbreport::{EngineConfig, HidReport, Trackpad, TrackpadCommand, TrackpadEvent};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use keys::KeyAction;
use usb::hid_device::{self, SharedEngine, UsbDriver, HID_PACKET_SIZE};

/// Capacity of the report channel between producers and the USB writer.
pub const REPORT_QUEUE: usize = 16;

type ReportSender = Sender<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE>;

static ENGINE: StaticCell<SharedEngine> = StaticCell::new();
static REPORTS: Channel<CriticalSectionRawMutex, HidReport, REPORT_QUEUE> = Channel::new();

// Keyboard page 0x07: `a`, left shift.
const KEY_A: u32 = 0x0007_0004;
const KEY_LEFT_SHIFT: u32 = 0x0007_00E1;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("kbreport starting");

    let engine: &'static SharedEngine = ENGINE.init(SharedEngine::new(EngineConfig::default()));

    let usb = hid_device::init(p.USBD, engine);
    spawner.must_spawn(usb_task(usb.device));
    spawner.must_spawn(hid_writer(
        usb.input_writer,
        usb.touchpad_writer,
        REPORTS.receiver(),
    ));

    // nRF52840-DK buttons 1-4.
    let bindings: [(AnyPin, KeyAction); 4] = [
        (p.P0_11.degrade(), KeyAction::Usage(KEY_A)),
        (p.P0_12.degrade(), KeyAction::Usage(KEY_LEFT_SHIFT)),
        (p.P0_24.degrade(), KeyAction::Usage(ConsumerUsage::VolumeUp.encoded())),
        (
            p.P0_25.degrade(),
            KeyAction::Trackpad(TrackpadCommand::MultiToggle),
        ),
    ];
    for (pin, action) in bindings {
        spawner.must_spawn(key(pin, action, engine, REPORTS.sender()));
    }

    spawner.must_spawn(trackpad(engine, REPORTS.sender()));
    spawner.must_spawn(trackpad_tick(engine));

    info!("all tasks spawned");
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_writer(
    input: embassy_usb::class::hid::HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
    touchpad: embassy_usb::class::hid::HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
    rx: Receiver<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE>,
) -> ! {
    hid_device::hid_writer_task(input, touchpad, rx).await
}

#[embassy_executor::task(pool_size = 4)]
async fn key(pin: AnyPin, action: KeyAction, engine: &'static SharedEngine, tx: ReportSender) -> ! {
    keys::key_task(pin, action, engine, tx).await
}

#[embassy_executor::task]
async fn trackpad(engine: &'static SharedEngine, tx: ReportSender) -> ! {
    let mut worker = Trackpad::new(engine, NoSensor, tx);
    worker.run().await
}

#[embassy_executor::task]
async fn trackpad_tick(engine: &'static SharedEngine) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(TRACKPAD_TICK_MS));
    loop {
        ticker.next().await;
        // Dropped while the queue is full.
        let _ = engine.post_trackpad_event(TrackpadEvent::Tick);
    }
}
