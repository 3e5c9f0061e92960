//! HID report engine for keyboards with an integrated trackpad.
//!
//! The crate turns key presses, consumer controls, mouse buttons and raw
//! touch-sensor samples into wire-ready HID input reports:
//!
//! - [`tracker`]: reference-counted modifier, keyboard (NKRO/HKRO),
//!   consumer and mouse state,
//! - [`trackpad`]: multi-finger contact aggregation and the worker that
//!   switches between mouse and precision touchpad reporting,
//! - [`hid`]: report layouts, report descriptors and feature reports,
//! - [`engine`]: the shared facade that owns every tracker.
//!
//! The library is `no_std` and host-testable (`cargo test --lib`). The
//! embedded binary in `main.rs` wires it to the nRF52840 USB peripheral.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod hid;
pub mod trackpad;
pub mod tracker;

pub use config::{ContactCountPolicy, EngineConfig, FlushPolicy, KeyboardReportType, UsageWidth};
pub use engine::{Engine, ReportSink};
pub use error::{Error, Result};
pub use hid::HidReport;
pub use trackpad::{TouchSensor, Trackpad, TrackpadCommand, TrackpadEvent};
