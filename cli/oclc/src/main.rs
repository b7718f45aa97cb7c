//! oclc — offline OpenCL kernel compiler and syntax checker.

mod commands;
mod io;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use oclc_driver::ComputeDriver;

#[derive(Parser)]
#[command(name = "oclc", version, about = "OpenCL compiler and syntax checker")]
struct Cli {
    /// Kernel source file to compile
    #[arg(short = 'c', long = "compile", value_name = "FILE")]
    compile: Option<PathBuf>,

    /// Output file (default: '<FILE>.clo')
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Architecture to compile for, a string of format '<PLATFORM>/<DEVICE>'.
    /// The default is the first platform, and the default device is the first
    /// device ordered by class in priority of DEFAULT, GPU, ACCELERATOR, CPU.
    #[arg(short = 'a', long = "arch", value_name = "ARCH")]
    arch: Option<String>,

    /// List all platforms and devices on the system
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Listing export format (json)
    #[arg(long = "export", value_name = "FORMAT", requires = "list")]
    export: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if !cli.list && cli.compile.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let driver = connect_driver()?;

    if cli.list {
        return commands::list::run(driver.as_ref(), cli.export.as_deref());
    }

    if let Some(input) = &cli.compile {
        return commands::compile::run(
            driver.as_ref(),
            input,
            cli.output.as_deref(),
            cli.arch.as_deref(),
        );
    }

    Ok(())
}

#[cfg(feature = "opencl")]
fn connect_driver() -> Result<Box<dyn ComputeDriver>> {
    use anyhow::Context;

    let driver =
        oclc_driver::opencl::OpenClDriver::connect().context("connecting to the OpenCL runtime")?;
    Ok(Box::new(driver))
}

#[cfg(not(feature = "opencl"))]
fn connect_driver() -> Result<Box<dyn ComputeDriver>> {
    anyhow::bail!(
        "OpenCL support is not compiled in.\n\
         Rebuild oclc with the OpenCL backend:\n  \
         cargo build -p oclc --features opencl"
    );
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use oclc_driver::fake::{FakeBuild, FakeDevice, FakeDriver, FakePlatform};
    use oclc_driver::DeviceClass;
    use std::fs;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse_like_the_classic_tool() {
        let cli = Cli::parse_from(["oclc", "-c", "k.cl", "-o", "k.bin", "-a", "Acme/Turbo"]);
        assert_eq!(cli.compile.as_deref(), Some(std::path::Path::new("k.cl")));
        assert_eq!(cli.output.as_deref(), Some(std::path::Path::new("k.bin")));
        assert_eq!(cli.arch.as_deref(), Some("Acme/Turbo"));
        assert!(!cli.list);
    }

    #[test]
    fn list_flag_parses() {
        let cli = Cli::parse_from(["oclc", "-l"]);
        assert!(cli.list);
        assert!(cli.compile.is_none());
    }

    /// Full workflow against the fake driver: compile a kernel, select the
    /// device explicitly, and find the artifact on disk.
    #[test]
    fn compile_workflow_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("k.cl");
        fs::write(&input, "__kernel void k() {}").unwrap();

        let driver = FakeDriver::new(vec![FakePlatform::new("Acme", "Acme").with_device(
            FakeDevice::new("Turbo", DeviceClass::GPU).with_binary(vec![7, 7, 7]),
        )]);
        commands::compile::run(&driver, &input, None, Some("Acme/Turbo")).unwrap();

        let artifact = dir.path().join("k.cl.clo");
        assert_eq!(fs::read(&artifact).unwrap(), vec![7, 7, 7]);
        assert_eq!(driver.contexts_released(), 1);
        assert_eq!(driver.programs_released(), 1);
    }

    /// A rejected build exits through the reported path without artifacts.
    #[test]
    fn failed_build_workflow_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("k.cl");
        fs::write(&input, "not opencl").unwrap();

        let driver = FakeDriver::new(vec![FakePlatform::new("Acme", "Acme")
            .with_device(FakeDevice::new("Turbo", DeviceClass::GPU))])
        .with_build(FakeBuild::Reject {
            log: "k.cl:1: error".into(),
        });
        let result = commands::compile::run(&driver, &input, None, None);
        assert!(result.is_err());
        assert!(!dir.path().join("k.cl.clo").exists());
    }

    #[test]
    fn listing_workflow_succeeds() {
        let driver = FakeDriver::new(vec![FakePlatform::new("Acme", "Acme")
            .with_device(FakeDevice::new("Turbo", DeviceClass::GPU | DeviceClass::DEFAULT))]);
        commands::list::run(&driver, None).unwrap();
        commands::list::run(&driver, Some("json")).unwrap();
    }
}
