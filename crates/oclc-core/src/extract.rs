//! Binary extraction.
//!
//! Pulls the per-device binaries out of a built program: query the bound
//! device count, query all binary sizes in one batch, allocate exactly the
//! reported sizes, then fill every buffer in a single batched read. The
//! driver's advisory "binaries written" count is logged but not validated.

use log::debug;
use oclc_driver::{DriverError, ProgramBinaries};

use crate::error::{PipelineError, Result};

/// One device's compiled binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinary {
    /// Index of the owning device among the program's bound devices.
    pub device_index: usize,
    /// Raw binary bytes; length equals the size the driver reported.
    pub bytes: Vec<u8>,
}

/// Extract all per-device binaries from a built program.
///
/// Returns one entry per bound device, aligned with device index. Any
/// metadata or read failure is fatal.
pub fn extract(program: &dyn ProgramBinaries) -> Result<Vec<ProgramBinary>> {
    let count = program
        .device_count()
        .map_err(PipelineError::ProgramInfoUnavailable)?;
    let sizes = program
        .binary_sizes()
        .map_err(PipelineError::ProgramInfoUnavailable)?;
    if sizes.len() != count {
        return Err(PipelineError::ProgramInfoUnavailable(DriverError::Protocol(
            "binary size table does not match reported device count",
        )));
    }

    let mut buffers: Vec<Vec<u8>> = sizes.iter().map(|&size| vec![0u8; size]).collect();
    let written = program
        .read_binaries(&mut buffers)
        .map_err(PipelineError::ProgramInfoUnavailable)?;
    debug!("driver reports {written} of {count} binaries written");

    Ok(buffers
        .into_iter()
        .enumerate()
        .map(|(device_index, bytes)| ProgramBinary {
            device_index,
            bytes,
        })
        .collect())
}
