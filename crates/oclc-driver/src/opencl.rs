//! OpenCL backend.
//!
//! Binds the [`ComputeDriver`] seam to a real OpenCL runtime through the
//! `opencl3` crate. Only available when compiled with the `opencl` feature.
//!
//! Platform handles index the platform list captured at [`OpenClDriver::connect`]
//! time; device lists are queried per platform on first use and cached for
//! the driver's lifetime. Contexts and programs own their `opencl3` wrappers,
//! which release the underlying OpenCL objects on drop.

use std::cell::RefCell;

use log::debug;
use opencl3::context::Context;
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
    CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
};
use opencl3::error_codes::ClError;
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_device_type, cl_int};

use crate::class::DeviceClass;
use crate::error::{DriverError, DriverResult};
use crate::{
    clamp_build_log, BuildOutcome, ComputeDriver, DeviceContext, DeviceHandle, PlatformHandle,
    ProgramBinaries,
};

/// Status code OpenCL reserves for a failed program build; every other
/// non-success status from the build call is an unhandled driver error.
const CL_BUILD_PROGRAM_FAILURE: cl_int = -11;

fn api_error(call: &'static str, err: ClError) -> DriverError {
    DriverError::Api { call, code: err.0 }
}

fn class_from_device_type(bits: cl_device_type) -> DeviceClass {
    let mut class = DeviceClass::empty();
    if bits & CL_DEVICE_TYPE_CPU != 0 {
        class |= DeviceClass::CPU;
    }
    if bits & CL_DEVICE_TYPE_GPU != 0 {
        class |= DeviceClass::GPU;
    }
    if bits & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        class |= DeviceClass::ACCELERATOR;
    }
    if bits & CL_DEVICE_TYPE_DEFAULT != 0 {
        class |= DeviceClass::DEFAULT;
    }
    class
}

/// Driver backed by the host's OpenCL runtime.
pub struct OpenClDriver {
    platforms: Vec<Platform>,
    // Device lists are filled lazily, one platform at a time, by
    // `device_handles`; info queries require the platform to have been
    // enumerated first.
    devices: RefCell<Vec<Option<Vec<cl_device_id>>>>,
}

impl OpenClDriver {
    /// Query the runtime's platform list and return a connected driver.
    pub fn connect() -> DriverResult<Self> {
        let platforms = get_platforms().map_err(|e| api_error("clGetPlatformIDs", e))?;
        debug!("OpenCL runtime reports {} platform(s)", platforms.len());
        let slots = vec![None; platforms.len()];
        Ok(Self {
            platforms,
            devices: RefCell::new(slots),
        })
    }

    fn platform(&self, handle: PlatformHandle) -> DriverResult<&Platform> {
        self.platforms
            .get(handle.0 as usize)
            .ok_or(DriverError::InvalidHandle("platform"))
    }

    fn device_id(&self, handle: DeviceHandle) -> DriverResult<cl_device_id> {
        self.devices
            .borrow()
            .get(handle.platform as usize)
            .and_then(|slot| slot.as_ref())
            .and_then(|ids| ids.get(handle.index as usize))
            .copied()
            .ok_or(DriverError::InvalidHandle("device"))
    }
}

impl ComputeDriver for OpenClDriver {
    fn platform_handles(&self) -> DriverResult<Vec<PlatformHandle>> {
        Ok((0..self.platforms.len() as u32).map(PlatformHandle).collect())
    }

    fn platform_name(&self, platform: PlatformHandle) -> DriverResult<String> {
        self.platform(platform)?
            .name()
            .map_err(|e| api_error("clGetPlatformInfo", e))
    }

    fn platform_vendor(&self, platform: PlatformHandle) -> DriverResult<String> {
        self.platform(platform)?
            .vendor()
            .map_err(|e| api_error("clGetPlatformInfo", e))
    }

    fn device_handles(&self, platform: PlatformHandle) -> DriverResult<Vec<DeviceHandle>> {
        let ids = self
            .platform(platform)?
            .get_devices(CL_DEVICE_TYPE_ALL)
            .map_err(|e| api_error("clGetDeviceIDs", e))?;
        debug!("platform {} has {} device(s)", platform.0, ids.len());
        let handles = (0..ids.len() as u32)
            .map(|index| DeviceHandle {
                platform: platform.0,
                index,
            })
            .collect();
        self.devices.borrow_mut()[platform.0 as usize] = Some(ids);
        Ok(handles)
    }

    fn device_name(&self, device: DeviceHandle) -> DriverResult<String> {
        Device::new(self.device_id(device)?)
            .name()
            .map_err(|e| api_error("clGetDeviceInfo", e))
    }

    fn device_vendor(&self, device: DeviceHandle) -> DriverResult<String> {
        Device::new(self.device_id(device)?)
            .vendor()
            .map_err(|e| api_error("clGetDeviceInfo", e))
    }

    fn device_class(&self, device: DeviceHandle) -> DriverResult<DeviceClass> {
        let bits = Device::new(self.device_id(device)?)
            .dev_type()
            .map_err(|e| api_error("clGetDeviceInfo", e))?;
        Ok(class_from_device_type(bits))
    }

    fn create_context(&self, device: DeviceHandle) -> DriverResult<Box<dyn DeviceContext>> {
        let id = self.device_id(device)?;
        let bound = Device::new(id);
        // Resolve the owning platform first; a device the runtime cannot
        // attribute to a platform cannot host a context.
        bound
            .platform()
            .map_err(|e| api_error("clGetDeviceInfo", e))?;
        let context =
            Context::from_device(&bound).map_err(|e| api_error("clCreateContext", e))?;
        Ok(Box::new(ClDeviceContext {
            context,
            device: id,
        }))
    }
}

struct ClDeviceContext {
    context: Context,
    device: cl_device_id,
}

impl DeviceContext for ClDeviceContext {
    fn build(&mut self, source: &[u8]) -> DriverResult<BuildOutcome> {
        let source = String::from_utf8_lossy(source);
        let mut program = Program::create_from_source(&self.context, &source)
            .map_err(|e| api_error("clCreateProgramWithSource", e))?;
        match program.build(&[self.device], "") {
            Ok(()) => Ok(BuildOutcome::Success(Box::new(ClProgram { program }))),
            Err(e) if e.0 == CL_BUILD_PROGRAM_FAILURE => {
                let log = program.get_build_log(self.device).unwrap_or_default();
                Ok(BuildOutcome::Failure {
                    log: clamp_build_log(log),
                })
            }
            Err(e) => Err(api_error("clBuildProgram", e)),
        }
    }
}

struct ClProgram {
    program: Program,
}

impl ProgramBinaries for ClProgram {
    fn device_count(&self) -> DriverResult<usize> {
        self.program
            .get_num_devices()
            .map(|n| n as usize)
            .map_err(|e| api_error("clGetProgramInfo", e))
    }

    fn binary_sizes(&self) -> DriverResult<Vec<usize>> {
        self.program
            .get_binary_sizes()
            .map_err(|e| api_error("clGetProgramInfo", e))
    }

    fn read_binaries(&self, buffers: &mut [Vec<u8>]) -> DriverResult<usize> {
        let binaries = self
            .program
            .get_binaries()
            .map_err(|e| api_error("clGetProgramInfo", e))?;
        for (buffer, binary) in buffers.iter_mut().zip(&binaries) {
            let n = buffer.len().min(binary.len());
            buffer[..n].copy_from_slice(&binary[..n]);
        }
        Ok(binaries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_bits_map_to_classes() {
        assert_eq!(
            class_from_device_type(CL_DEVICE_TYPE_GPU | CL_DEVICE_TYPE_DEFAULT),
            DeviceClass::GPU | DeviceClass::DEFAULT
        );
        assert_eq!(
            class_from_device_type(CL_DEVICE_TYPE_CPU),
            DeviceClass::CPU
        );
        assert_eq!(class_from_device_type(0), DeviceClass::empty());
    }
}
