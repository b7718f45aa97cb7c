//! Device selection.
//!
//! A [`SelectionTarget`] resolves to exactly one catalog device. Explicit
//! targets are exact string lookups; an unspecified target falls back to a
//! fixed class-priority policy evaluated platform-major: each platform is
//! fully exhausted — all four class passes — before the next platform is
//! considered, so platform discovery order dominates and class priority
//! breaks ties within a platform.

use oclc_driver::DeviceClass;

use crate::catalog::{Catalog, DeviceRef};
use crate::error::{PipelineError, Result};

/// Class passes of the default-selection policy, highest priority first.
const CLASS_PRIORITY: [DeviceClass; 4] = [
    DeviceClass::DEFAULT,
    DeviceClass::GPU,
    DeviceClass::ACCELERATOR,
    DeviceClass::CPU,
];

/// What the user asked to compile for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionTarget {
    /// No architecture given; apply the class-priority policy.
    Unspecified,
    /// An exact platform/device pair by name.
    Explicit {
        /// Platform name to match exactly.
        platform: String,
        /// Device name to match exactly.
        device: String,
    },
}

impl SelectionTarget {
    /// Parse an `-a` architecture spec of the form `<PLATFORM>/<DEVICE>`.
    ///
    /// The split is at the first `/`, so device names may themselves contain
    /// slashes. A spec with no separator is rejected up front.
    pub fn parse_arch(spec: &str) -> Result<Self> {
        match spec.split_once('/') {
            Some((platform, device)) => Ok(SelectionTarget::Explicit {
                platform: platform.to_string(),
                device: device.to_string(),
            }),
            None => Err(PipelineError::InvalidArchSpec(spec.to_string())),
        }
    }
}

/// Resolve a selection target against the catalog.
///
/// Both paths are deterministic for a fixed catalog; duplicate names resolve
/// to the first occurrence in discovery order.
pub fn resolve(catalog: &Catalog, target: &SelectionTarget) -> Result<DeviceRef> {
    match target {
        SelectionTarget::Explicit { platform, device } => {
            resolve_explicit(catalog, platform, device)
        }
        SelectionTarget::Unspecified => resolve_default(catalog),
    }
}

fn resolve_explicit(catalog: &Catalog, platform: &str, device: &str) -> Result<DeviceRef> {
    for (pi, entry) in catalog.platforms().iter().enumerate() {
        if entry.name != platform {
            continue;
        }
        for (di, dev) in entry.devices.iter().enumerate() {
            if dev.name == device {
                return Ok(DeviceRef {
                    platform: pi,
                    device: di,
                });
            }
        }
    }
    Err(PipelineError::DeviceNotFound {
        platform: platform.to_string(),
        device: device.to_string(),
    })
}

fn resolve_default(catalog: &Catalog) -> Result<DeviceRef> {
    for (pi, entry) in catalog.platforms().iter().enumerate() {
        for class in CLASS_PRIORITY {
            for (di, dev) in entry.devices.iter().enumerate() {
                if dev.class.contains(class) {
                    return Ok(DeviceRef {
                        platform: pi,
                        device: di,
                    });
                }
            }
        }
    }
    Err(PipelineError::NoSuitableDevice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oclc_driver::fake::{FakeDevice, FakeDriver, FakePlatform};

    fn catalog_of(platforms: Vec<FakePlatform>) -> Catalog {
        let driver = FakeDriver::new(platforms);
        Catalog::discover(&driver).unwrap()
    }

    #[test]
    fn gpu_beats_cpu_within_a_platform() {
        let catalog = catalog_of(vec![FakePlatform::new("Acme", "Acme")
            .with_device(FakeDevice::new("X", DeviceClass::CPU))
            .with_device(FakeDevice::new("Y", DeviceClass::GPU))]);
        let selected = resolve(&catalog, &SelectionTarget::Unspecified).unwrap();
        assert_eq!(catalog.device(selected).unwrap().name, "Y");
    }

    #[test]
    fn default_class_wins_first_pass() {
        let catalog = catalog_of(vec![FakePlatform::new("Acme", "Acme")
            .with_device(FakeDevice::new("X", DeviceClass::CPU | DeviceClass::DEFAULT))]);
        let selected = resolve(&catalog, &SelectionTarget::Unspecified).unwrap();
        assert_eq!(catalog.device(selected).unwrap().name, "X");
    }

    #[test]
    fn platform_order_dominates_class_priority() {
        // Platform 0 only has a CPU; platform 1 has a GPU. The CPU still
        // wins because platform 0 is exhausted first.
        let catalog = catalog_of(vec![
            FakePlatform::new("First", "V")
                .with_device(FakeDevice::new("cpu0", DeviceClass::CPU)),
            FakePlatform::new("Second", "V")
                .with_device(FakeDevice::new("gpu1", DeviceClass::GPU)),
        ]);
        let selected = resolve(&catalog, &SelectionTarget::Unspecified).unwrap();
        assert_eq!(catalog.device(selected).unwrap().name, "cpu0");
    }

    #[test]
    fn class_pass_order_within_platform() {
        // Accelerator listed before GPU, but GPU has the higher pass.
        let catalog = catalog_of(vec![FakePlatform::new("Acme", "V")
            .with_device(FakeDevice::new("accel", DeviceClass::ACCELERATOR))
            .with_device(FakeDevice::new("gpu", DeviceClass::GPU))]);
        let selected = resolve(&catalog, &SelectionTarget::Unspecified).unwrap();
        assert_eq!(catalog.device(selected).unwrap().name, "gpu");
    }

    #[test]
    fn default_selection_is_deterministic() {
        let make = || {
            catalog_of(vec![
                FakePlatform::new("P0", "V")
                    .with_device(FakeDevice::new("a", DeviceClass::CPU))
                    .with_device(FakeDevice::new("b", DeviceClass::GPU))
                    .with_device(FakeDevice::new("c", DeviceClass::GPU)),
                FakePlatform::new("P1", "V")
                    .with_device(FakeDevice::new("d", DeviceClass::DEFAULT)),
            ])
        };
        let first = resolve(&make(), &SelectionTarget::Unspecified).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&make(), &SelectionTarget::Unspecified).unwrap(), first);
        }
        // First GPU in device order on the first platform.
        assert_eq!(first, DeviceRef { platform: 0, device: 1 });
    }

    #[test]
    fn no_device_of_any_class_is_fatal() {
        let catalog = catalog_of(vec![FakePlatform::new("Empty", "V")]);
        assert!(matches!(
            resolve(&catalog, &SelectionTarget::Unspecified),
            Err(PipelineError::NoSuitableDevice)
        ));
    }

    #[test]
    fn explicit_lookup_finds_exact_pair() {
        let catalog = catalog_of(vec![
            FakePlatform::new("Acme", "V").with_device(FakeDevice::new("X", DeviceClass::CPU)),
            FakePlatform::new("Zenith", "V").with_device(FakeDevice::new("X", DeviceClass::GPU)),
        ]);
        let target = SelectionTarget::Explicit {
            platform: "Zenith".into(),
            device: "X".into(),
        };
        let selected = resolve(&catalog, &target).unwrap();
        assert_eq!(selected, DeviceRef { platform: 1, device: 0 });
    }

    #[test]
    fn duplicate_names_resolve_to_first_occurrence() {
        let catalog = catalog_of(vec![FakePlatform::new("Acme", "V")
            .with_device(FakeDevice::new("X", DeviceClass::CPU))
            .with_device(FakeDevice::new("X", DeviceClass::GPU))]);
        let target = SelectionTarget::Explicit {
            platform: "Acme".into(),
            device: "X".into(),
        };
        let selected = resolve(&catalog, &target).unwrap();
        assert_eq!(selected, DeviceRef { platform: 0, device: 0 });
    }

    #[test]
    fn missing_device_reports_requested_pair() {
        let catalog = catalog_of(vec![FakePlatform::new("Acme", "V")
            .with_device(FakeDevice::new("X", DeviceClass::CPU))]);
        let target = SelectionTarget::Explicit {
            platform: "Acme".into(),
            device: "Z".into(),
        };
        match resolve(&catalog, &target) {
            Err(PipelineError::DeviceNotFound { platform, device }) => {
                assert_eq!(platform, "Acme");
                assert_eq!(device, "Z");
            }
            other => panic!("expected DeviceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn device_search_continues_across_same_named_platforms() {
        // Two platforms share a name; the device only exists on the second.
        let catalog = catalog_of(vec![
            FakePlatform::new("Acme", "V").with_device(FakeDevice::new("A", DeviceClass::CPU)),
            FakePlatform::new("Acme", "V").with_device(FakeDevice::new("B", DeviceClass::GPU)),
        ]);
        let target = SelectionTarget::Explicit {
            platform: "Acme".into(),
            device: "B".into(),
        };
        let selected = resolve(&catalog, &target).unwrap();
        assert_eq!(selected, DeviceRef { platform: 1, device: 0 });
    }

    #[test]
    fn arch_spec_splits_at_first_slash() {
        let target = SelectionTarget::parse_arch("Acme CL/Turbo/2").unwrap();
        assert_eq!(
            target,
            SelectionTarget::Explicit {
                platform: "Acme CL".into(),
                device: "Turbo/2".into(),
            }
        );
    }

    #[test]
    fn arch_spec_without_separator_is_rejected() {
        assert!(matches!(
            SelectionTarget::parse_arch("just-a-platform"),
            Err(PipelineError::InvalidArchSpec(_))
        ));
    }
}
