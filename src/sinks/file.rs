use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const JSON_SUFFIX: &str = "_reformat.json";
pub const GPX_SUFFIX: &str = ".gpx";

/// Replace `path` with `contents` in one step.
///
/// The text goes to a hidden sibling first and is renamed into place, so a
/// reader never sees a partially written artifact.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    log::debug!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ride.gpx");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, "<gpx/>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<gpx/>");

        // no temporary left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ride.gpx");
        assert!(write_atomic(&path, "x").is_err());
        assert!(!path.exists());
    }
}
