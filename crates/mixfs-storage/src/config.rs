//! Configuration for the virtual filesystem

use crate::directory::DEFAULT_WRITE_CHUNK_SIZE;
use crate::error::{Result, StorageError};
use mixfs_formats::TablePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for [`VirtualFileSystem::from_config`](crate::VirtualFileSystem::from_config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Primary game directory (in-memory storage when unset)
    pub root: Option<PathBuf>,

    /// Search-only overlay directories, searched after the root
    pub overlays: Vec<PathBuf>,

    /// Match names exactly instead of resolving case
    pub case_sensitive: bool,

    /// Create the root directory if it is missing
    pub create_root: bool,

    /// Fall back to in-memory storage if the root cannot be opened
    pub memory_fallback: bool,

    /// Archives to load, base first (later archives take precedence)
    pub archives: Vec<String>,

    /// Files never registered as standalone overrides
    pub standalone_exclusions: Vec<String>,

    /// Truncated entry table handling
    pub table_policy: TablePolicy,

    /// Chunk size for streamed writes
    pub write_chunk_size: usize,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            root: None,
            overlays: Vec::new(),
            case_sensitive: false,
            create_root: false,
            memory_fallback: false,
            archives: Vec::new(),
            standalone_exclusions: Vec::new(),
            table_policy: TablePolicy::Lenient,
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
        }
    }
}

impl VfsConfig {
    /// Create a configuration rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.write_chunk_size == 0 {
            return Err(StorageError::Config(
                "write_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.root.is_none() && !self.overlays.is_empty() {
            return Err(StorageError::Config(
                "overlays require a root directory".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the root directory
    #[must_use]
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Add an overlay directory
    #[must_use]
    pub fn with_overlay<P: AsRef<Path>>(mut self, overlay: P) -> Self {
        self.overlays.push(overlay.as_ref().to_path_buf());
        self
    }

    /// Enable or disable exact name matching
    #[must_use]
    pub const fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Create the root if missing
    #[must_use]
    pub const fn with_create_root(mut self, create_root: bool) -> Self {
        self.create_root = create_root;
        self
    }

    /// Fall back to in-memory storage
    #[must_use]
    pub const fn with_memory_fallback(mut self, memory_fallback: bool) -> Self {
        self.memory_fallback = memory_fallback;
        self
    }

    /// Add an archive (loaded after, and taking precedence over, earlier ones)
    #[must_use]
    pub fn with_archive(mut self, name: impl Into<String>) -> Self {
        self.archives.push(name.into());
        self
    }

    /// Exclude a file from standalone registration
    #[must_use]
    pub fn with_standalone_exclusion(mut self, name: impl Into<String>) -> Self {
        self.standalone_exclusions.push(name.into());
        self
    }

    /// Set the truncated table policy
    #[must_use]
    pub const fn with_table_policy(mut self, table_policy: TablePolicy) -> Self {
        self.table_policy = table_policy;
        self
    }

    /// Set the write chunk size
    #[must_use]
    pub const fn with_write_chunk_size(mut self, size: usize) -> Self {
        self.write_chunk_size = size;
        self
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_round_trip() {
        let config = VfsConfig::new("/games/ra2")
            .with_overlay("/games/ra2/mods/yuri")
            .with_archive("ra2.mix")
            .with_archive("language.mix")
            .with_standalone_exclusion("ra2md.ini")
            .with_table_policy(TablePolicy::Strict);

        let json = serde_json::to_string(&config).expect("Operation should succeed");
        let parsed = VfsConfig::from_json_str(&json).expect("Operation should succeed");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VfsConfig::from_json_str(r#"{"root": "/games/ts", "archives": ["tibsun.mix"]}"#)
            .unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/games/ts")));
        assert_eq!(config.archives, vec!["tibsun.mix".to_string()]);
        assert_eq!(config.table_policy, TablePolicy::Lenient);
        assert_eq!(config.write_chunk_size, DEFAULT_WRITE_CHUNK_SIZE);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            VfsConfig::from_json_str(r#"{"write_chunk_size": 0}"#),
            Err(StorageError::Config(_))
        ));
        assert!(matches!(
            VfsConfig::from_json_str(r#"{"overlays": ["/mods"]}"#),
            Err(StorageError::Config(_))
        ));
        assert!(matches!(
            VfsConfig::from_json_str("not json"),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"case_sensitive": true}"#).unwrap();
        let config = VfsConfig::from_json_file(file.path()).unwrap();
        assert!(config.case_sensitive);

        assert!(VfsConfig::from_json_file(file.path().join("missing")).is_err());
    }
}
