//! `oclc -l` — list platforms and devices.

use anyhow::{bail, Result};
use oclc_core::Catalog;
use oclc_driver::ComputeDriver;

/// Print the platform and device listing, or a JSON export of the catalog.
pub fn run(driver: &dyn ComputeDriver, export: Option<&str>) -> Result<()> {
    let catalog = Catalog::discover(driver)?;
    match export {
        None => {
            print!("{}", platform_listing(&catalog));
            print!("{}", device_listing(&catalog));
        }
        Some("json") => println!("{}", render_json(&catalog)?),
        Some(other) => bail!("unknown export format: '{other}' (expected 'json')"),
    }
    Ok(())
}

/// Platform listing, one `<index>: '<vendor>' / '<name>'` line per platform.
fn platform_listing(catalog: &Catalog) -> String {
    let mut out = String::from("Platforms supported on THIS machine:\n");
    out.push_str("ID: VENDOR / NAME\n");
    for (index, platform) in catalog.platforms().iter().enumerate() {
        out.push_str(&format!(
            "{index}: '{}' / '{}'\n",
            platform.vendor, platform.name
        ));
    }
    out
}

/// Device listing, one line per device with its class tags appended.
fn device_listing(catalog: &Catalog) -> String {
    let mut out = String::from("Devices supported on THIS machine:\n");
    out.push_str("PLATFORM ID: VENDOR / NAME TYPE\n");
    for (index, platform) in catalog.platforms().iter().enumerate() {
        for device in &platform.devices {
            out.push_str(&format!(
                "{index}: '{}' / '{}' {}\n",
                device.vendor,
                device.name,
                device.class.labels().concat()
            ));
        }
    }
    out
}

/// Serialize the catalog's platforms to pretty JSON.
fn render_json(catalog: &Catalog) -> Result<String> {
    Ok(serde_json::to_string_pretty(catalog.platforms())?)
}
