//! Output artifact naming policy.

use std::path::{Path, PathBuf};

/// Default output path for a kernel source file: the input path with `.clo`
/// appended (`kernel.cl` becomes `kernel.cl.clo`).
pub fn default_output_path(input: &Path) -> PathBuf {
    append_suffix(input, ".clo")
}

/// Path for one device's binary.
///
/// A program bound to a single device writes to the output path as-is; with
/// several bound devices each binary goes to `<output>.<deviceIndex>`.
pub fn artifact_path(output: &Path, device_index: usize, device_count: usize) -> PathBuf {
    if device_count > 1 {
        append_suffix(output, &format!(".{device_index}"))
    } else {
        output.to_path_buf()
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}
