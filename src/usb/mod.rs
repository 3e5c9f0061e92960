//! USB device subsystem - presents the report engine to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The device exposes two HID interfaces:
//!
//! - Interface 0: keyboard, consumer and mouse (report ids 1-3)
//! - Interface 1: precision touchpad with its feature reports (ids 5-9)
//!
//! The writer task drains the engine's report channel and routes each
//! report to the interface that declares it.

pub mod hid_device;
