//! Source reading and artifact writing.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Read the kernel source file into an owned buffer.
///
/// A missing file yields an empty buffer — "no source" — which callers must
/// treat as fatal before any driver work. Other I/O failures are errors.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Create or overwrite an artifact file with owner read/write permission and
/// write all bytes.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = read_source(&dir.path().join("nope.cl")).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn existing_source_reads_fully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.cl");
        fs::write(&path, b"__kernel void k() {}").unwrap();
        assert_eq!(read_source(&path).unwrap(), b"__kernel void k() {}");
    }

    #[test]
    fn artifact_is_written_and_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.clo");
        write_artifact(&path, &[1, 2, 3]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn artifact_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.clo");
        write_artifact(&path, &[0xFF; 64]).unwrap();
        write_artifact(&path, &[1]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1]);
    }
}
