//! USB HID composite device.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes the input and touchpad endpoints.

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_usb::class::hid::{
    Config as HidConfig, HidWriter, ReportId, RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use kbreport::config;
use kbreport::hid::descriptor::COMPOSITE_REPORT_DESCRIPTOR;
use kbreport::hid::touch::TRACKPAD_REPORT_DESCRIPTOR;
use kbreport::hid::{HidReport, MAX_REPORT_SIZE};
use kbreport::{Engine, TrackpadEvent};
use static_cell::StaticCell;

use crate::REPORT_QUEUE;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;
pub type SharedEngine = Engine<CriticalSectionRawMutex>;

/// Endpoint buffer size; large enough for every input report.
pub const HID_PACKET_SIZE: usize = 64;

const _: () = assert!(MAX_REPORT_SIZE <= HID_PACKET_SIZE);

static INPUT_STATE: StaticCell<State> = StaticCell::new();
static TOUCHPAD_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static USB_DEVICE_HANDLER: StaticCell<DeviceHandler> = StaticCell::new();
static FEATURE_HANDLER: StaticCell<FeatureHandler> = StaticCell::new();

/// Bus state changes. A fresh configuration means a new host that has not
/// negotiated touchpad mode yet.
struct DeviceHandler {
    engine: &'static SharedEngine,
}

impl embassy_usb::Handler for DeviceHandler {
    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        if configured && self.engine.post_trackpad_event(TrackpadEvent::EndpointChanged).is_err() {
            warn!("endpoint change not delivered");
        }
    }

    fn suspended(&mut self, suspended: bool) {
        info!("USB suspended: {}", suspended);
    }
}

/// GET_REPORT / SET_REPORT on the touchpad interface.
struct FeatureHandler {
    engine: &'static SharedEngine,
}

impl RequestHandler for FeatureHandler {
    fn get_report(&mut self, id: ReportId, buf: &mut [u8]) -> Option<usize> {
        match id {
            ReportId::Feature(id) => match self.engine.get_feature_report(id, buf) {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("GET_REPORT feature {} failed: {}", id, e);
                    None
                }
            },
            _ => None,
        }
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        match id {
            ReportId::Feature(id) => match self.engine.set_feature_report(id, data) {
                Ok(()) => OutResponse::Accepted,
                Err(e) => {
                    warn!("SET_REPORT feature {} failed: {}", id, e);
                    OutResponse::Rejected
                }
            },
            _ => OutResponse::Rejected,
        }
    }
}

/// Build result containing the USB device runner and both HID writers.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub input_writer: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
    pub touchpad_writer: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD, engine: &'static SharedEngine) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    // Holds the 257-byte certification feature report.
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 512]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    builder.handler(USB_DEVICE_HANDLER.init(DeviceHandler { engine }));

    let input_state = INPUT_STATE.init(State::new());
    let input_config = HidConfig {
        report_descriptor: &COMPOSITE_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: HID_PACKET_SIZE as u16,
    };
    let input_writer = HidWriter::new(&mut builder, input_state, input_config);

    let touchpad_state = TOUCHPAD_STATE.init(State::new());
    let touchpad_config = HidConfig {
        report_descriptor: &TRACKPAD_REPORT_DESCRIPTOR,
        request_handler: Some(FEATURE_HANDLER.init(FeatureHandler { engine })),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: HID_PACKET_SIZE as u16,
    };
    let touchpad_writer = HidWriter::new(&mut builder, touchpad_state, touchpad_config);

    let device = builder.build();

    info!("USB HID composite device initialised (keyboard + touchpad)");

    UsbHidDevice {
        device,
        input_writer,
        touchpad_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Report forwarding - reads the report channel and writes each report
/// to the interface that declares its id.
pub async fn hid_writer_task(
    mut input: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
    mut touchpad: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
    report_rx: Receiver<'static, CriticalSectionRawMutex, HidReport, REPORT_QUEUE>,
) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut buf = [0u8; HID_PACKET_SIZE];

    loop {
        let report = report_rx.receive().await;
        let n = report.serialize(&mut buf);
        if n == 0 {
            warn!("report did not fit the endpoint buffer");
            continue;
        }

        let result = match &report {
            HidReport::Keyboard(_) | HidReport::Consumer(_) | HidReport::Mouse(_) => {
                input.write(&buf[..n]).await
            }
            HidReport::Touch(_) => touchpad.write(&buf[..n]).await,
            HidReport::Boot(_) => {
                warn!("boot report has no endpoint on this device");
                continue;
            }
        };
        if result.is_err() {
            warn!("USB HID write failed");
        }
    }
}
