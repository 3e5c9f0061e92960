//! Input state trackers.
//!
//! Each tracker owns one slice of the device state and knows how to turn
//! it into the key data of its report. The [`Engine`](crate::engine::Engine)
//! wraps each one in its own mutex.

pub mod consumer;
pub mod keyboard;
pub mod modifiers;
pub mod mouse;

pub use consumer::ConsumerTracker;
pub use keyboard::{HkroKeys, KeyTracker, KeyboardTracker, NkroKeys};
pub use modifiers::{Modifier, ModifierState};
pub use mouse::{MouseButton, MouseState};
