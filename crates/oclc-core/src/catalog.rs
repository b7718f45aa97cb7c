//! Platform and device catalog.
//!
//! [`Catalog::discover`] walks the driver once and caches identifying
//! metadata for every platform and device on the host. The catalog is an
//! immutable value passed by reference into the selector and the session;
//! the position of an entry in discovery order is its stable ID in listings.

use log::debug;
use oclc_driver::{ComputeDriver, DeviceClass, DeviceHandle, PlatformHandle};
use serde::{Serialize, Serializer};

use crate::error::{PipelineError, Result};

/// Upper bound on a cached platform or device info field, in bytes. Longer
/// strings are truncated, never reported as an error. This mirrors the
/// fixed-size query buffers of the classic tooling so listings stay
/// format-compatible.
pub const INFO_FIELD_LIMIT: usize = 128;

/// One discovered platform and its attached devices.
#[derive(Debug, Serialize)]
pub struct PlatformEntry {
    #[serde(skip)]
    pub(crate) handle: PlatformHandle,
    /// Platform name, truncated to [`INFO_FIELD_LIMIT`].
    pub name: String,
    /// Platform vendor, truncated to [`INFO_FIELD_LIMIT`].
    pub vendor: String,
    /// Devices in discovery order.
    pub devices: Vec<DeviceEntry>,
}

/// One discovered device.
#[derive(Debug, Serialize)]
pub struct DeviceEntry {
    #[serde(skip)]
    pub(crate) handle: DeviceHandle,
    /// Device name, truncated to [`INFO_FIELD_LIMIT`].
    pub name: String,
    /// Device vendor, truncated to [`INFO_FIELD_LIMIT`].
    pub vendor: String,
    /// Class bitmask.
    #[serde(rename = "classes", serialize_with = "serialize_class")]
    pub class: DeviceClass,
}

fn serialize_class<S: Serializer>(class: &DeviceClass, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    class.names().serialize(serializer)
}

/// Position of a device in the catalog: platform index, then device index,
/// both in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRef {
    /// Index of the owning platform.
    pub platform: usize,
    /// Index of the device within its platform.
    pub device: usize,
}

/// Immutable table of every platform and device on the host.
#[derive(Debug)]
pub struct Catalog {
    platforms: Vec<PlatformEntry>,
}

impl Catalog {
    /// Enumerate all platforms and devices.
    ///
    /// Fatal if the host reports no platforms, if platform info cannot be
    /// read, or if any platform's devices cannot be enumerated. Enumeration
    /// failures are permanent for the process lifetime; nothing is retried.
    pub fn discover(driver: &dyn ComputeDriver) -> Result<Self> {
        let handles = driver
            .platform_handles()
            .map_err(|_| PipelineError::NoPlatformsFound)?;
        if handles.is_empty() {
            return Err(PipelineError::NoPlatformsFound);
        }

        let mut platforms = Vec::with_capacity(handles.len());
        for handle in handles {
            let name = driver
                .platform_name(handle)
                .map(truncate_field)
                .map_err(PipelineError::PlatformInfoUnavailable)?;
            let vendor = driver
                .platform_vendor(handle)
                .map(truncate_field)
                .map_err(PipelineError::PlatformInfoUnavailable)?;

            let device_handles =
                driver
                    .device_handles(handle)
                    .map_err(|source| PipelineError::DeviceEnumerationFailed {
                        platform: name.clone(),
                        source,
                    })?;

            let mut devices = Vec::with_capacity(device_handles.len());
            for device in device_handles {
                let entry = Self::describe_device(driver, device).map_err(|source| {
                    PipelineError::DeviceEnumerationFailed {
                        platform: name.clone(),
                        source,
                    }
                })?;
                devices.push(entry);
            }

            debug!("platform '{name}': {} device(s)", devices.len());
            platforms.push(PlatformEntry {
                handle,
                name,
                vendor,
                devices,
            });
        }

        Ok(Self { platforms })
    }

    fn describe_device(
        driver: &dyn ComputeDriver,
        handle: DeviceHandle,
    ) -> std::result::Result<DeviceEntry, oclc_driver::DriverError> {
        let class = driver.device_class(handle)?;
        let name = truncate_field(driver.device_name(handle)?);
        let vendor = truncate_field(driver.device_vendor(handle)?);
        Ok(DeviceEntry {
            handle,
            name,
            vendor,
            class,
        })
    }

    /// All platforms in discovery order.
    pub fn platforms(&self) -> &[PlatformEntry] {
        &self.platforms
    }

    /// Look up a device by catalog position.
    pub fn device(&self, at: DeviceRef) -> Option<&DeviceEntry> {
        self.platforms.get(at.platform)?.devices.get(at.device)
    }
}

/// Truncate an info field to [`INFO_FIELD_LIMIT`] bytes without splitting a
/// UTF-8 code point.
fn truncate_field(mut s: String) -> String {
    if s.len() > INFO_FIELD_LIMIT {
        let mut end = INFO_FIELD_LIMIT;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
