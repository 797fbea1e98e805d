//! Filesystem utilities.
//!
//! Safe primitives for writing files in a crash-tolerant way.
//!
//! The ledger document and every published artifact go through these
//! helpers: a partial write (power loss, crash) must never leave a
//! truncated file visible under its final name. Windows semantics differ
//! from Unix for rename-over-existing; both are handled.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Path Validation
// =============================================================================

/// Validates that an identifier is safe to use as a file path component.
///
/// Rejects empty identifiers, path traversal sequences (`..`), path
/// separators, drive-letter colons, and control characters. Any id used
/// to build a storage locator MUST pass through here first.
pub fn validate_path_id_component(id: &str, label: &str) -> CoreResult<()> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{label} is empty")));
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err(CoreError::Validation(format!(
            "invalid {label}: contains path traversal characters"
        )));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(CoreError::Validation(format!(
            "invalid {label}: contains control characters"
        )));
    }
    Ok(())
}

// =============================================================================
// Atomic Writes
// =============================================================================

fn tmp_path_for(path: &Path) -> PathBuf {
    // Unique sibling name so concurrent writers never share a temp file.
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!("{}.{}.tmp", name, ulid::Ulid::new()))
}

fn bak_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!("{}.bak", name))
}

/// Write bytes to `path` using an atomic replace pattern: write to a
/// sibling temp file, flush + fsync, then rename into place.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)
}

/// Write a JSON document atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

/// Move `src_tmp` over `dest`, tolerating platforms where
/// rename-over-existing fails by swapping through a `.bak` file.
pub fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    let bak = bak_path_for(dest);
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            // Restore the previous file so the store is never left empty.
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        atomic_write_bytes(&path, b"one").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");

        atomic_write_bytes(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        atomic_write_bytes(&path, b"payload").unwrap();
        atomic_write_bytes(&path, b"payload2").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "doc.json")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }

    #[test]
    fn atomic_write_json_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        let value = serde_json::json!({"a": 1, "b": ["x", "y"]});
        atomic_write_json_pretty(&path, &value).unwrap();

        let loaded: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn id_component_validation() {
        assert!(validate_path_id_component("01HXYZ123ABC", "assetId").is_ok());
        assert!(validate_path_id_component("asset_001", "assetId").is_ok());

        assert!(validate_path_id_component("", "assetId").is_err());
        assert!(validate_path_id_component("../evil", "assetId").is_err());
        assert!(validate_path_id_component("a/b", "assetId").is_err());
        assert!(validate_path_id_component("a\\b", "assetId").is_err());
        assert!(validate_path_id_component("C:evil", "assetId").is_err());
        assert!(validate_path_id_component("a\0b", "assetId").is_err());
    }
}
