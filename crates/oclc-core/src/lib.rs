//! Device selection and compilation pipeline for the oclc kernel compiler.
//!
//! The pipeline runs in fixed stages over a [`ComputeDriver`]:
//!
//! 1. [`Catalog::discover`] enumerates platforms and their devices into an
//!    immutable catalog, indexed by discovery order.
//! 2. [`select::resolve`] turns a [`SelectionTarget`] into exactly one
//!    catalog device, by exact lookup or by the class-priority policy.
//! 3. [`Session`] binds a context to the chosen device and submits the
//!    kernel source for compilation.
//! 4. A successful build yields a [`CompiledProgram`], whose binaries the
//!    extractor pulls out size-checked, one per bound device.
//!
//! Everything is synchronous and single-shot; the only non-fatal outcome is
//! a rejected build, which surfaces the driver's diagnostic log instead of
//! an artifact.
//!
//! [`ComputeDriver`]: oclc_driver::ComputeDriver

pub mod catalog;
pub mod error;
pub mod extract;
pub mod output;
pub mod select;
pub mod session;

pub use catalog::{Catalog, DeviceEntry, DeviceRef, PlatformEntry};
pub use error::{PipelineError, Result};
pub use extract::ProgramBinary;
pub use select::SelectionTarget;
pub use session::{BuildResult, CompiledProgram, Session};
