//! In-memory compute driver with scriptable outcomes.
//!
//! [`FakeDriver`] serves a fixed catalog of platforms and devices and plays
//! back a scripted build result, so the whole pipeline can run without a
//! vendor runtime. Each failure the real runtime can produce — info queries,
//! device enumeration, context creation, program queries — can be switched
//! on individually. The driver also counts context/program creations and
//! releases, which lets tests assert that resources are released on every
//! exit path.

use std::cell::RefCell;
use std::rc::Rc;

use crate::class::DeviceClass;
use crate::error::{DriverError, DriverResult};
use crate::{
    clamp_build_log, BuildOutcome, ComputeDriver, DeviceContext, DeviceHandle, PlatformHandle,
    ProgramBinaries,
};

/// A scripted device.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    /// Device name.
    pub name: String,
    /// Device vendor.
    pub vendor: String,
    /// Class bitmask.
    pub class: DeviceClass,
    /// The binary a successful build produces for this device.
    pub binary: Vec<u8>,
}

impl FakeDevice {
    /// A device with the given name and class, a stock vendor, and a small
    /// placeholder binary.
    pub fn new(name: impl Into<String>, class: DeviceClass) -> Self {
        Self {
            name: name.into(),
            vendor: "Acme Compute Corp.".into(),
            class,
            binary: vec![0x4f, 0x43, 0x4c, 0x42],
        }
    }

    /// Override the vendor string.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Override the binary produced on a successful build.
    pub fn with_binary(mut self, binary: Vec<u8>) -> Self {
        self.binary = binary;
        self
    }
}

/// A scripted platform and its attached devices.
#[derive(Debug, Clone)]
pub struct FakePlatform {
    /// Platform name.
    pub name: String,
    /// Platform vendor.
    pub vendor: String,
    /// Attached devices, in discovery order.
    pub devices: Vec<FakeDevice>,
}

impl FakePlatform {
    /// An empty platform with the given name and vendor.
    pub fn new(name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: vendor.into(),
            devices: Vec::new(),
        }
    }

    /// Append a device.
    pub fn with_device(mut self, device: FakeDevice) -> Self {
        self.devices.push(device);
        self
    }
}

/// Scripted result of a build submission.
#[derive(Debug, Clone)]
pub enum FakeBuild {
    /// Compilation succeeds; binaries come from the bound device.
    Succeed,
    /// The runtime rejects the source with this diagnostic log.
    Reject {
        /// The scripted build log.
        log: String,
    },
    /// The build call itself fails with a raw status code.
    Abort {
        /// The scripted status code.
        code: i32,
    },
}

#[derive(Default)]
struct Counters {
    contexts_created: u32,
    contexts_released: u32,
    programs_created: u32,
    programs_released: u32,
}

struct Inner {
    platforms: Vec<FakePlatform>,
    build: FakeBuild,
    deny_platform_info: bool,
    deny_device_enumeration: bool,
    deny_context_creation: bool,
    deny_program_info: bool,
    counters: Counters,
}

/// The scriptable in-memory driver.
pub struct FakeDriver {
    inner: Rc<RefCell<Inner>>,
}

impl FakeDriver {
    /// A driver serving the given platforms, with builds succeeding.
    pub fn new(platforms: Vec<FakePlatform>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                platforms,
                build: FakeBuild::Succeed,
                deny_platform_info: false,
                deny_device_enumeration: false,
                deny_context_creation: false,
                deny_program_info: false,
                counters: Counters::default(),
            })),
        }
    }

    /// Script the result of build submissions.
    pub fn with_build(self, build: FakeBuild) -> Self {
        self.inner.borrow_mut().build = build;
        self
    }

    /// Make platform name/vendor queries fail.
    pub fn deny_platform_info(self) -> Self {
        self.inner.borrow_mut().deny_platform_info = true;
        self
    }

    /// Make device enumeration fail for every platform.
    pub fn deny_device_enumeration(self) -> Self {
        self.inner.borrow_mut().deny_device_enumeration = true;
        self
    }

    /// Make context creation fail.
    pub fn deny_context_creation(self) -> Self {
        self.inner.borrow_mut().deny_context_creation = true;
        self
    }

    /// Make program binary-metadata queries fail.
    pub fn deny_program_info(self) -> Self {
        self.inner.borrow_mut().deny_program_info = true;
        self
    }

    /// Number of contexts handed out so far.
    pub fn contexts_created(&self) -> u32 {
        self.inner.borrow().counters.contexts_created
    }

    /// Number of contexts released (dropped) so far.
    pub fn contexts_released(&self) -> u32 {
        self.inner.borrow().counters.contexts_released
    }

    /// Number of programs handed out so far.
    pub fn programs_created(&self) -> u32 {
        self.inner.borrow().counters.programs_created
    }

    /// Number of programs released (dropped) so far.
    pub fn programs_released(&self) -> u32 {
        self.inner.borrow().counters.programs_released
    }

    fn device(&self, handle: DeviceHandle) -> DriverResult<FakeDevice> {
        let inner = self.inner.borrow();
        inner
            .platforms
            .get(handle.platform as usize)
            .and_then(|p| p.devices.get(handle.index as usize))
            .cloned()
            .ok_or(DriverError::InvalidHandle("device"))
    }
}

impl ComputeDriver for FakeDriver {
    fn platform_handles(&self) -> DriverResult<Vec<PlatformHandle>> {
        let inner = self.inner.borrow();
        Ok((0..inner.platforms.len() as u32).map(PlatformHandle).collect())
    }

    fn platform_name(&self, platform: PlatformHandle) -> DriverResult<String> {
        let inner = self.inner.borrow();
        if inner.deny_platform_info {
            return Err(DriverError::Api {
                call: "clGetPlatformInfo",
                code: -30,
            });
        }
        inner
            .platforms
            .get(platform.0 as usize)
            .map(|p| p.name.clone())
            .ok_or(DriverError::InvalidHandle("platform"))
    }

    fn platform_vendor(&self, platform: PlatformHandle) -> DriverResult<String> {
        let inner = self.inner.borrow();
        if inner.deny_platform_info {
            return Err(DriverError::Api {
                call: "clGetPlatformInfo",
                code: -30,
            });
        }
        inner
            .platforms
            .get(platform.0 as usize)
            .map(|p| p.vendor.clone())
            .ok_or(DriverError::InvalidHandle("platform"))
    }

    fn device_handles(&self, platform: PlatformHandle) -> DriverResult<Vec<DeviceHandle>> {
        let inner = self.inner.borrow();
        if inner.deny_device_enumeration {
            return Err(DriverError::Api {
                call: "clGetDeviceIDs",
                code: -30,
            });
        }
        let entry = inner
            .platforms
            .get(platform.0 as usize)
            .ok_or(DriverError::InvalidHandle("platform"))?;
        Ok((0..entry.devices.len() as u32)
            .map(|index| DeviceHandle {
                platform: platform.0,
                index,
            })
            .collect())
    }

    fn device_name(&self, device: DeviceHandle) -> DriverResult<String> {
        self.device(device).map(|d| d.name)
    }

    fn device_vendor(&self, device: DeviceHandle) -> DriverResult<String> {
        self.device(device).map(|d| d.vendor)
    }

    fn device_class(&self, device: DeviceHandle) -> DriverResult<DeviceClass> {
        self.device(device).map(|d| d.class)
    }

    fn create_context(&self, device: DeviceHandle) -> DriverResult<Box<dyn DeviceContext>> {
        let bound = self.device(device)?;
        let mut inner = self.inner.borrow_mut();
        if inner.deny_context_creation {
            return Err(DriverError::Api {
                call: "clCreateContext",
                code: -2,
            });
        }
        inner.counters.contexts_created += 1;
        Ok(Box::new(FakeContext {
            state: Rc::clone(&self.inner),
            device: bound,
        }))
    }
}

struct FakeContext {
    state: Rc<RefCell<Inner>>,
    device: FakeDevice,
}

impl DeviceContext for FakeContext {
    fn build(&mut self, _source: &[u8]) -> DriverResult<BuildOutcome> {
        let build = self.state.borrow().build.clone();
        match build {
            FakeBuild::Succeed => {
                self.state.borrow_mut().counters.programs_created += 1;
                Ok(BuildOutcome::Success(Box::new(FakeProgram {
                    binaries: vec![self.device.binary.clone()],
                    deny_info: self.state.borrow().deny_program_info,
                    state: Some(Rc::clone(&self.state)),
                })))
            }
            FakeBuild::Reject { log } => Ok(BuildOutcome::Failure {
                log: clamp_build_log(log),
            }),
            FakeBuild::Abort { code } => Err(DriverError::Api {
                call: "clBuildProgram",
                code,
            }),
        }
    }
}

impl Drop for FakeContext {
    fn drop(&mut self) {
        self.state.borrow_mut().counters.contexts_released += 1;
    }
}

/// A built program serving scripted binaries.
///
/// Normally produced by a [`FakeContext`] build; tests that exercise the
/// extractor alone can construct one directly with any number of device
/// binaries via [`FakeProgram::with_binaries`].
pub struct FakeProgram {
    binaries: Vec<Vec<u8>>,
    deny_info: bool,
    state: Option<Rc<RefCell<Inner>>>,
}

impl FakeProgram {
    /// A stand-alone program bound to `binaries.len()` devices.
    pub fn with_binaries(binaries: Vec<Vec<u8>>) -> Self {
        Self {
            binaries,
            deny_info: false,
            state: None,
        }
    }

    /// Make binary-metadata queries fail.
    pub fn deny_info(mut self) -> Self {
        self.deny_info = true;
        self
    }
}

impl ProgramBinaries for FakeProgram {
    fn device_count(&self) -> DriverResult<usize> {
        if self.deny_info {
            return Err(DriverError::Api {
                call: "clGetProgramInfo",
                code: -30,
            });
        }
        Ok(self.binaries.len())
    }

    fn binary_sizes(&self) -> DriverResult<Vec<usize>> {
        if self.deny_info {
            return Err(DriverError::Api {
                call: "clGetProgramInfo",
                code: -30,
            });
        }
        Ok(self.binaries.iter().map(Vec::len).collect())
    }

    fn read_binaries(&self, buffers: &mut [Vec<u8>]) -> DriverResult<usize> {
        if self.deny_info {
            return Err(DriverError::Api {
                call: "clGetProgramInfo",
                code: -30,
            });
        }
        for (buffer, binary) in buffers.iter_mut().zip(&self.binaries) {
            let n = buffer.len().min(binary.len());
            buffer[..n].copy_from_slice(&binary[..n]);
        }
        Ok(self.binaries.len())
    }
}

impl Drop for FakeProgram {
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            state.borrow_mut().counters.programs_released += 1;
        }
    }
}
