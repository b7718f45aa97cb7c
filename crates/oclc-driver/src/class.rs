//! Device class bitmask.

use bitflags::bitflags;

bitflags! {
    /// Capability classes a compute device can advertise.
    ///
    /// This is a bitmask: a runtime may report a device under several classes
    /// at once (a GPU that is also the platform's default device is common).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceClass: u32 {
        /// A host-style processor.
        const CPU = 1 << 0;
        /// A graphics processor.
        const GPU = 1 << 1;
        /// A dedicated accelerator.
        const ACCELERATOR = 1 << 2;
        /// The platform's designated default device.
        const DEFAULT = 1 << 3;
    }
}

impl DeviceClass {
    /// Listing tags for every class this device matches, in the order the
    /// listing prints them. The spellings are kept compatible with the
    /// historical tool output.
    pub fn labels(self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.contains(DeviceClass::CPU) {
            labels.push("-processor-");
        }
        if self.contains(DeviceClass::GPU) {
            labels.push("-graphics processor-");
        }
        if self.contains(DeviceClass::ACCELERATOR) {
            labels.push("-accellerator-");
        }
        if self.contains(DeviceClass::DEFAULT) {
            labels.push("-default-");
        }
        labels
    }

    /// Lowercase class names, for machine-readable listings.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(DeviceClass::CPU) {
            names.push("cpu");
        }
        if self.contains(DeviceClass::GPU) {
            names.push("gpu");
        }
        if self.contains(DeviceClass::ACCELERATOR) {
            names.push("accelerator");
        }
        if self.contains(DeviceClass::DEFAULT) {
            names.push("default");
        }
        names
    }
}
