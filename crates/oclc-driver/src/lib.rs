//! Compute-driver abstraction for the oclc kernel compiler.
//!
//! The pipeline in `oclc-core` never talks to a vendor runtime directly; it
//! drives the [`ComputeDriver`] seam defined here. Two implementations ship
//! with this crate:
//!
//! - [`fake::FakeDriver`] — an in-memory driver with scriptable outcomes,
//!   used by the test suites and available for development without any
//!   vendor runtime installed.
//! - `opencl::OpenClDriver` — the real OpenCL binding, only available when
//!   compiled with the `opencl` feature.
//!
//! Handles returned by a driver are opaque and only meaningful to the driver
//! that produced them. Contexts and programs are returned as owning boxed
//! objects; dropping them releases the underlying driver resources.

pub mod class;
pub mod error;
pub mod fake;

#[cfg(feature = "opencl")]
pub mod opencl;

pub use class::DeviceClass;
pub use error::{DriverError, DriverResult};

/// Upper bound on a captured build log, in bytes. Longer logs are truncated.
pub const BUILD_LOG_CAPACITY: usize = 128 * 1024;

/// Opaque handle to a compute platform, scoped to the driver that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformHandle(pub(crate) u32);

/// Opaque handle to a compute device, scoped to the driver that issued it.
///
/// A device handle also identifies the owning platform, so a driver can
/// resolve the platform when creating a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub(crate) platform: u32,
    pub(crate) index: u32,
}

/// Result of submitting kernel source for compilation.
///
/// A rejected build (bad kernel source) is a normal outcome carrying the
/// driver's diagnostic log; it is distinct from a driver *error*, which the
/// build call reports through its `Result`.
pub enum BuildOutcome {
    /// The program compiled; its binaries can be extracted.
    Success(Box<dyn ProgramBinaries>),
    /// The driver rejected the source. `log` holds the build diagnostics,
    /// truncated to [`BUILD_LOG_CAPACITY`].
    Failure {
        /// Diagnostic log as reported by the driver.
        log: String,
    },
}

impl std::fmt::Debug for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOutcome::Success(_) => f.debug_tuple("Success").finish_non_exhaustive(),
            BuildOutcome::Failure { log } => {
                f.debug_struct("Failure").field("log", log).finish()
            }
        }
    }
}

/// A vendor compute runtime, as seen by the compilation pipeline.
///
/// All calls are synchronous and block until the underlying runtime returns.
/// Enumeration calls may be issued in any order, but info queries are only
/// valid for handles previously returned by the same driver instance.
pub trait ComputeDriver {
    /// Enumerate all platforms known to the runtime, in discovery order.
    fn platform_handles(&self) -> DriverResult<Vec<PlatformHandle>>;

    /// Platform name string.
    fn platform_name(&self, platform: PlatformHandle) -> DriverResult<String>;

    /// Platform vendor string.
    fn platform_vendor(&self, platform: PlatformHandle) -> DriverResult<String>;

    /// Enumerate all devices of a platform in one batch, in discovery order.
    fn device_handles(&self, platform: PlatformHandle) -> DriverResult<Vec<DeviceHandle>>;

    /// Device name string.
    fn device_name(&self, device: DeviceHandle) -> DriverResult<String>;

    /// Device vendor string.
    fn device_vendor(&self, device: DeviceHandle) -> DriverResult<String>;

    /// Device class bitmask. A device may match several classes.
    fn device_class(&self, device: DeviceHandle) -> DriverResult<DeviceClass>;

    /// Create a compilation context bound to exactly one device.
    ///
    /// The driver resolves the device's owning platform itself; failure to do
    /// so is reported the same way as any other context-creation error.
    fn create_context(&self, device: DeviceHandle) -> DriverResult<Box<dyn DeviceContext>>;
}

/// A live driver context bound to one device.
///
/// Dropping the context releases the driver-side resource.
pub trait DeviceContext {
    /// Submit raw kernel source for compilation, with no build options.
    ///
    /// The source length is passed to the runtime explicitly; the buffer is
    /// never null-terminated at the driver boundary.
    ///
    /// Returns `Ok(BuildOutcome::Failure { .. })` for the runtime's
    /// designated build-failure status, and `Err` for every other
    /// non-success status.
    fn build(&mut self, source: &[u8]) -> DriverResult<BuildOutcome>;
}

/// Binary query surface of a successfully built program.
///
/// Dropping the program releases the driver-side resource.
pub trait ProgramBinaries {
    /// Number of devices the program is bound to.
    fn device_count(&self) -> DriverResult<usize>;

    /// Per-device binary sizes in bytes, aligned with device index, fetched
    /// in one batched call.
    fn binary_sizes(&self) -> DriverResult<Vec<usize>>;

    /// Fill the caller-allocated buffers with the per-device binaries in one
    /// batched call. Buffer `i` must be sized per `binary_sizes()[i]`.
    ///
    /// Returns the driver's advisory count of binaries written, which callers
    /// are not required to validate.
    fn read_binaries(&self, buffers: &mut [Vec<u8>]) -> DriverResult<usize>;
}

/// Truncate a build log to [`BUILD_LOG_CAPACITY`] without splitting a UTF-8
/// code point.
pub fn clamp_build_log(mut log: String) -> String {
    if log.len() > BUILD_LOG_CAPACITY {
        let mut end = BUILD_LOG_CAPACITY;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_log_unchanged() {
        let log = "error: kernel.cl:3: expected ';'".to_string();
        assert_eq!(clamp_build_log(log.clone()), log);
    }

    #[test]
    fn long_log_truncated_to_capacity() {
        let log = "x".repeat(BUILD_LOG_CAPACITY + 4096);
        assert_eq!(clamp_build_log(log).len(), BUILD_LOG_CAPACITY);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; force the cap onto the middle of a code point.
        let mut log = "a".repeat(BUILD_LOG_CAPACITY - 1);
        log.push_str("ééé");
        let clamped = clamp_build_log(log);
        assert!(clamped.len() <= BUILD_LOG_CAPACITY);
        assert!(clamped.is_char_boundary(clamped.len()));
    }
}
