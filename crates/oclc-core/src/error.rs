//! Pipeline error taxonomy.
//!
//! Every variant here is fatal to the compilation attempt: the pipeline
//! never retries, since driver and environment anomalies are not expected
//! to be transient within one invocation. A rejected kernel build is *not*
//! an error — it is the reported [`BuildResult::Failure`] outcome.
//!
//! [`BuildResult::Failure`]: crate::session::BuildResult

use oclc_driver::DriverError;
use thiserror::Error;

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The host reports no compute platforms, or the platform list cannot
    /// be read at all.
    #[error("no compute platforms found")]
    NoPlatformsFound,

    /// A platform name or vendor query failed.
    #[error("could not read platform info: {0}")]
    PlatformInfoUnavailable(#[source] DriverError),

    /// Device enumeration or a device info query failed for a platform.
    #[error("could not enumerate devices for platform '{platform}': {source}")]
    DeviceEnumerationFailed {
        /// Name of the platform whose devices could not be read.
        platform: String,
        /// The underlying driver error.
        #[source]
        source: DriverError,
    },

    /// An explicitly requested platform/device pair is not in the catalog.
    #[error("could not find device '{platform}/{device}'")]
    DeviceNotFound {
        /// Requested platform name.
        platform: String,
        /// Requested device name.
        device: String,
    },

    /// No device of any class exists on any platform.
    #[error("no suitable device on any platform")]
    NoSuitableDevice,

    /// The driver could not create a context for the selected device.
    #[error("could not create device context: {0}")]
    ContextCreationFailed(#[source] DriverError),

    /// The build call failed with a status other than the designated
    /// build-failure code. The driver contract for such codes is
    /// unspecified, so there is no recovery path.
    #[error("unhandled error while building program: {0}")]
    UnhandledBuildError(#[source] DriverError),

    /// Program binary metadata (device count, sizes, bytes) could not be
    /// read from a successfully built program.
    #[error("could not read program binary info: {0}")]
    ProgramInfoUnavailable(#[source] DriverError),

    /// An `-a` architecture spec that does not name both a platform and a
    /// device.
    #[error("malformed architecture spec '{0}': expected '<PLATFORM>/<DEVICE>'")]
    InvalidArchSpec(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
