//! Unified error type for kbreport.
//!
//! We avoid `alloc` - all error variants are fieldless and `Copy`.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the engine.
///
/// Every failing operation leaves tracker state untouched, so callers can
/// treat any variant as "nothing happened".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Tracker input
    /// Usage, button, modifier or finger index outside its valid domain.
    #[error("index out of range")]
    OutOfRange,

    /// Release without a matching prior press (a caller bug).
    #[error("release without matching press")]
    InvalidState,

    /// Usage cannot be represented with the configured report width.
    #[error("usage not representable in this configuration")]
    UnsupportedUsage,

    /// Usage page is not handled by any tracker.
    #[error("unsupported usage page")]
    UnsupportedPage,

    // Plumbing
    /// A bounded event or report queue is full; the item was dropped.
    #[error("queue full")]
    QueueFull,

    /// Buffer too small for the requested report.
    #[error("buffer too small")]
    BufferTooSmall,

    /// Feature report id not known to this device.
    #[error("unknown report id")]
    UnknownReport,

    /// No report descriptor matches the configured report layout.
    #[error("configuration has no matching report descriptor")]
    UnsupportedConfig,

    /// The touch sensor refused a reconfiguration request.
    #[error("sensor reconfiguration failed")]
    Sensor,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
