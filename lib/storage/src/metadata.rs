//! The profile catalog: codes, source files and image shapes.
//!
//! The catalog is the human-readable companion of the binary index snapshot.
//! It is stored as pretty-printed JSON so operators can inspect which images
//! went into a build, and written atomically like the index itself.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use profilex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Per-profile bookkeeping recorded at indexing time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    pub file_path: String,
    pub file_size: u64,
    /// Height, width and channel count of the source image
    pub image_shape: (u32, u32, u8),
}

/// Catalog of every indexed profile, keyed by profile code.
///
/// `profile_codes` preserves index slot order; `profiles` holds the records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub profile_codes: Vec<String>,
    pub profiles: HashMap<String, ProfileRecord>,
}

impl CatalogMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profile_codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile_codes.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.profiles.contains_key(code)
    }

    /// Register a profile, keeping slot order and record map in step.
    pub fn insert(&mut self, code: String, record: ProfileRecord) {
        if !self.profiles.contains_key(&code) {
            self.profile_codes.push(code.clone());
        }
        self.profiles.insert(code, record);
    }

    pub fn record(&self, code: &str) -> Option<&ProfileRecord> {
        self.profiles.get(code)
    }

    /// Resolve a user-supplied code to its canonical stored form.
    ///
    /// Exact matches win; otherwise the lookup falls back to the first
    /// case-insensitive match in slot order.
    pub fn resolve_code(&self, query: &str) -> Option<&str> {
        if self.profiles.contains_key(query) {
            return self.profile_codes.iter().find(|c| *c == query).map(String::as_str);
        }
        self.profile_codes
            .iter()
            .find(|c| c.eq_ignore_ascii_case(query))
            .map(String::as_str)
    }

    /// Save as pretty JSON through an atomic rename.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Persistence(format!("catalog serialization failed: {e}")))?;

        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| std::io::Write::write_all(f, &data))
            .map_err(|e| {
                Error::Persistence(format!("atomic write to {} failed: {e}", path.display()))
            })?;

        info!(path = %path.display(), profiles = self.len(), "Catalog saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let catalog: Self = serde_json::from_slice(&data)
            .map_err(|e| Error::Persistence(format!("catalog deserialization failed: {e}")))?;
        debug!(path = %path.display(), profiles = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }
}
