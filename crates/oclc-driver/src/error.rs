//! Error type for driver operations.

use thiserror::Error;

/// Errors reported by a compute driver.
///
/// The underlying runtimes expose an open-ended integer status space; this
/// type closes it. Known failure shapes get their own variants, and any
/// unrecognized non-success status is carried verbatim in [`DriverError::Api`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// A runtime call returned a non-success status code.
    #[error("driver call {call} failed with status {code}")]
    Api {
        /// The runtime entry point that failed.
        call: &'static str,
        /// The raw status code, as defined by the runtime.
        code: i32,
    },

    /// A handle was passed to a driver that did not issue it, or refers to
    /// an entry that was never enumerated.
    #[error("stale or foreign driver handle: {0}")]
    InvalidHandle(&'static str),

    /// The driver violated its own reporting contract (e.g. a size table
    /// whose length does not match the reported device count).
    #[error("driver protocol violation: {0}")]
    Protocol(&'static str),
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
