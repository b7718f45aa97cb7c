//! Compilation session.
//!
//! A [`Session`] owns the driver context for the selected device and submits
//! the kernel source for compilation. Success hands back a
//! [`CompiledProgram`], the only type extraction is possible from — the
//! build-failure path cannot reach the extractor by construction. Contexts
//! and programs release their driver resources when dropped, on every exit
//! path.

use log::{debug, info};
use oclc_driver::{BuildOutcome, ComputeDriver, DeviceContext, ProgramBinaries};

use crate::catalog::{Catalog, DeviceRef};
use crate::error::{PipelineError, Result};
use crate::extract::{self, ProgramBinary};

/// A compilation context bound to one selected device.
pub struct Session {
    context: Box<dyn DeviceContext>,
    device_name: String,
}

/// Outcome of submitting kernel source for compilation.
pub enum BuildResult {
    /// The program compiled; binaries can be extracted.
    Success(CompiledProgram),
    /// The driver rejected the source. This is a reported outcome, not a
    /// pipeline error: the caller emits the log and exits without artifacts.
    Failure {
        /// The driver's diagnostic log, possibly truncated.
        log: String,
    },
}

/// A successfully built program, ready for binary extraction.
pub struct CompiledProgram {
    program: Box<dyn ProgramBinaries>,
}

impl Session {
    /// Create a context bound to the selected device.
    ///
    /// The driver resolves the device's owning platform as part of context
    /// creation; any failure there is fatal.
    pub fn create(
        driver: &dyn ComputeDriver,
        catalog: &Catalog,
        selection: DeviceRef,
    ) -> Result<Self> {
        let entry = catalog.device(selection).ok_or_else(|| {
            PipelineError::ContextCreationFailed(oclc_driver::DriverError::InvalidHandle(
                "selection out of catalog range",
            ))
        })?;
        let context = driver
            .create_context(entry.handle)
            .map_err(PipelineError::ContextCreationFailed)?;
        info!("compiling for device '{}'", entry.name);
        Ok(Self {
            context,
            device_name: entry.name.clone(),
        })
    }

    /// Name of the device this session is bound to.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Submit raw kernel source, with no build options.
    ///
    /// A rejected build is returned as [`BuildResult::Failure`]; any other
    /// driver error is fatal. Failed builds are never retried.
    pub fn build(&mut self, source: &[u8]) -> Result<BuildResult> {
        debug!("submitting {} bytes of kernel source", source.len());
        match self
            .context
            .build(source)
            .map_err(PipelineError::UnhandledBuildError)?
        {
            BuildOutcome::Success(program) => Ok(BuildResult::Success(CompiledProgram { program })),
            BuildOutcome::Failure { log } => Ok(BuildResult::Failure { log }),
        }
    }
}

impl CompiledProgram {
    /// Extract the per-device binaries. See [`extract::extract`].
    pub fn extract(&self) -> Result<Vec<ProgramBinary>> {
        extract::extract(self.program.as_ref())
    }
}
