//! Binary index snapshots.
//!
//! The whole flat index is serialized with bincode and written through an
//! atomic rename, so a crash mid-save never leaves a torn snapshot behind.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use profilex_core::{Error, FlatIndex, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Save `index` to `path`, creating parent directories as needed.
pub fn save_index<P: AsRef<Path>>(index: &FlatIndex, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let data = bincode::serialize(index)
        .map_err(|e| Error::Persistence(format!("index serialization failed: {e}")))?;

    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| std::io::Write::write_all(f, &data))
        .map_err(|e| Error::Persistence(format!("atomic write to {} failed: {e}", path.display())))?;

    info!(
        path = %path.display(),
        vectors = index.len(),
        bytes = data.len(),
        "Index snapshot saved"
    );
    Ok(())
}

/// Load an index snapshot from `path`.
pub fn load_index<P: AsRef<Path>>(path: P) -> Result<FlatIndex> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let index: FlatIndex = bincode::deserialize(&data)
        .map_err(|e| Error::Persistence(format!("index deserialization failed: {e}")))?;
    debug!(
        path = %path.display(),
        vectors = index.len(),
        "Index snapshot loaded"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use profilex_core::Vector;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index
            .build(
                vec![
                    Vector::from_slice(&[1.0, 0.0, 0.0]),
                    Vector::from_slice(&[0.0, 1.0, 0.0]),
                ],
                vec!["P-001".to_string(), "P-002".to_string()],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let index = sample_index();
        save_index(&index, &path).unwrap();

        let loaded = load_index(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.code_at(0).unwrap(), "P-001");
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/index.bin");

        save_index(&sample_index(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_overwrites_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");

        save_index(&sample_index(), &path).unwrap();

        let mut bigger = sample_index();
        bigger
            .add(Vector::from_slice(&[0.0, 0.0, 1.0]), "P-003".to_string())
            .unwrap();
        save_index(&bigger, &path).unwrap();

        let loaded = load_index(&path).unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_index(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_load_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, b"not a snapshot").unwrap();

        let err = load_index(&path).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }
}
