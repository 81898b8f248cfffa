use crate::error::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Replace `target` in one rename. The temp file lives next to the target so
/// the rename never crosses filesystems; readers see the old or the new
/// content, never a prefix.
pub fn atomic_write(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".vbconvert-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Pretty JSON with a trailing newline, written atomically.
pub fn write_json<T: Serialize>(target: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    atomic_write(target, text.as_bytes())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    Ok(std::fs::create_dir_all(dir)?)
}

/// `Ok(None)` for a missing file; any other read failure is an error.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nested_target_gets_its_parents() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("Facility/tasks/01-dtos.md");
        atomic_write(&target, b"# DTOs").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# DTOs");
    }

    #[test]
    fn second_write_wins_and_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("conversion-status.json");
        write_json(&target, &serde_json::json!({"overallStatus": "running"})).unwrap();
        write_json(&target, &serde_json::json!({"overallStatus": "completed"})).unwrap();

        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.contains("completed"));
        assert!(text.ends_with('\n'));
        let entries = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn absent_file_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_optional(&tmp.path().join("tabs.json")).unwrap(), None);
    }
}
