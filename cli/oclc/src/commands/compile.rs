//! `oclc -c` — compile a kernel source file to device binaries.

use std::path::Path;

use anyhow::{bail, Result};
use oclc_core::{output, select, BuildResult, Catalog, SelectionTarget, Session};
use oclc_driver::ComputeDriver;

use crate::io;

/// Run the full pipeline: discover, select, build, extract, write.
///
/// A rejected kernel build prints the driver's log to stderr and returns an
/// error after writing nothing; a failed artifact write is only a
/// diagnostic and does not abort the remaining artifacts.
pub fn run(
    driver: &dyn ComputeDriver,
    input: &Path,
    output_path: Option<&Path>,
    arch: Option<&str>,
) -> Result<()> {
    let target = match arch {
        Some(spec) => SelectionTarget::parse_arch(spec)?,
        None => SelectionTarget::Unspecified,
    };

    let catalog = Catalog::discover(driver)?;
    let selection = select::resolve(&catalog, &target)?;
    log::debug!(
        "resolved target to platform {} device {}",
        selection.platform,
        selection.device
    );

    let source = io::read_source(input)?;
    if source.is_empty() {
        bail!("no kernel source in '{}'", input.display());
    }

    let mut session = Session::create(driver, &catalog, selection)?;
    let program = match session.build(&source)? {
        BuildResult::Success(program) => program,
        BuildResult::Failure { log } => {
            eprintln!("{log}");
            bail!("kernel build failed");
        }
    };

    let binaries = program.extract()?;
    let output_path = match output_path {
        Some(path) => path.to_path_buf(),
        None => output::default_output_path(input),
    };

    for binary in &binaries {
        let path = output::artifact_path(&output_path, binary.device_index, binaries.len());
        if let Err(e) = io::write_artifact(&path, &binary.bytes) {
            eprintln!("warning: could not write '{}': {e}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oclc_driver::fake::{FakeBuild, FakeDevice, FakeDriver, FakePlatform};
    use oclc_driver::DeviceClass;
    use std::fs;

    fn gpu_driver() -> FakeDriver {
        FakeDriver::new(vec![FakePlatform::new("Acme", "Acme").with_device(
            FakeDevice::new("Turbo", DeviceClass::GPU).with_binary(vec![0xCA, 0xFE]),
        )])
    }

    fn write_kernel(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("k.cl");
        fs::write(&path, "__kernel void k() {}").unwrap();
        path
    }

    #[test]
    fn compile_writes_binary_to_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());
        let out = dir.path().join("k.clo");

        run(&gpu_driver(), &input, Some(&out), None).unwrap();
        assert_eq!(fs::read(&out).unwrap(), vec![0xCA, 0xFE]);
    }

    #[test]
    fn compile_defaults_output_to_input_plus_clo() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());

        run(&gpu_driver(), &input, None, None).unwrap();
        let expected = dir.path().join("k.cl.clo");
        assert_eq!(fs::read(&expected).unwrap(), vec![0xCA, 0xFE]);
    }

    #[test]
    fn explicit_arch_selects_named_device() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());
        let out = dir.path().join("k.clo");

        run(&gpu_driver(), &input, Some(&out), Some("Acme/Turbo")).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn unknown_arch_pair_fails_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());
        let out = dir.path().join("k.clo");

        let result = run(&gpu_driver(), &input, Some(&out), Some("Acme/Nope"));
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn malformed_arch_fails_before_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());

        let result = run(&gpu_driver(), &input, None, Some("no-separator"));
        assert!(result.is_err());
    }

    #[test]
    fn missing_source_is_fatal_before_building() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("absent.cl");
        let driver = gpu_driver();

        let result = run(&driver, &input, None, None);
        assert!(result.is_err());
        assert_eq!(driver.contexts_created(), 0);
    }

    #[test]
    fn rejected_build_writes_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());
        let out = dir.path().join("k.clo");
        let driver = gpu_driver().with_build(FakeBuild::Reject {
            log: "k.cl:1: error: parse error".into(),
        });

        let result = run(&driver, &input, Some(&out), None);
        assert!(result.is_err());
        assert!(!out.exists());
        // The context is still released on the failure path.
        assert_eq!(driver.contexts_released(), 1);
    }

    #[test]
    fn unhandled_build_status_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_kernel(dir.path());
        let driver = gpu_driver().with_build(FakeBuild::Abort { code: -6 });

        assert!(run(&driver, &input, None, None).is_err());
    }
}
