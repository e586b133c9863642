//! Ordered set of storage directories
//!
//! The first directory is the primary one and receives every write. Later
//! directories are search-only overlays (mod or map folders). Reads try the
//! directories in registration order; a miss moves on to the next one, any
//! other failure ends the search.

use crate::directory::StorageDirectory;
use crate::error::{Result, StorageError};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use mixfs_formats::VirtualFile;
use tracing::debug;

/// Primary directory plus search overlays
#[derive(Debug, Clone)]
pub struct StorageRoot {
    directories: Vec<StorageDirectory>,
}

impl StorageRoot {
    /// Create a root with its primary directory
    pub fn new(primary: StorageDirectory) -> Self {
        Self {
            directories: vec![primary],
        }
    }

    /// Append a search overlay
    pub fn add_directory(&mut self, directory: StorageDirectory) {
        debug!("Added overlay directory {}", directory.name());
        self.directories.push(directory);
    }

    /// Directory receiving writes
    pub fn primary(&self) -> &StorageDirectory {
        &self.directories[0]
    }

    /// All directories in search order
    pub fn directories(&self) -> &[StorageDirectory] {
        &self.directories
    }

    fn searched(&self) -> Vec<String> {
        self.directories
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// First child directory named `name`
    pub async fn get_directory(&self, name: &str) -> Result<StorageDirectory> {
        for directory in &self.directories {
            match directory.get_directory(name).await {
                Err(e) if e.is_not_found() => {}
                result => return result,
            }
        }
        Err(StorageError::not_found(name, self.searched()))
    }

    /// First file named `name`
    pub async fn open_file(&self, name: &str) -> Result<VirtualFile> {
        for directory in &self.directories {
            match directory.open_file(name, false).await {
                Err(e) if e.is_not_found() => {}
                result => return result,
            }
        }
        Err(StorageError::not_found(name, self.searched()))
    }

    /// First file named `name`, as raw bytes
    pub async fn get_raw_file(&self, name: &str) -> Result<Bytes> {
        for directory in &self.directories {
            match directory.get_raw_file(name, false).await {
                Err(e) if e.is_not_found() => {}
                result => return result,
            }
        }
        Err(StorageError::not_found(name, self.searched()))
    }

    /// True if any directory has an entry named `name`
    pub async fn contains_entry(&self, name: &str) -> Result<bool> {
        for directory in &self.directories {
            match directory.contains_entry(name).await {
                Ok(false) => {}
                Err(e) if e.is_not_found() => {}
                result => return result,
            }
        }
        Ok(false)
    }

    /// Names from every directory, in search order, without deduplication
    pub fn list_entries(&self) -> BoxStream<'static, Result<String>> {
        let streams: Vec<_> = self
            .directories
            .iter()
            .map(StorageDirectory::list_entries)
            .collect();
        stream::iter(streams).flatten().boxed()
    }

    /// Write to the primary directory
    pub async fn write_file(&self, view: &VirtualFile, name_override: Option<&str>) -> Result<()> {
        self.primary().write_file(view, name_override).await
    }

    /// Delete from the primary directory
    pub async fn delete_file(&self, name: &str, skip_case_fix: bool) -> Result<()> {
        self.primary().delete_file(name, skip_case_fix).await
    }

    /// Open or create a child of the primary directory
    pub async fn get_or_create_directory(&self, name: &str) -> Result<StorageDirectory> {
        self.primary().get_or_create_directory(name).await
    }

    /// Remove a child of the primary directory
    pub async fn delete_directory(&self, name: &str, recursive: bool) -> Result<()> {
        self.primary().delete_directory(name, recursive).await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::MemoryDirectory;
    use crate::error::StorageErrorKind;
    use futures::TryStreamExt;
    use std::io;
    use std::sync::Arc;

    fn layered() -> (MemoryDirectory, MemoryDirectory, StorageRoot) {
        let primary = MemoryDirectory::new("game");
        let overlay = MemoryDirectory::new("mod");
        let mut root = StorageRoot::new(StorageDirectory::new(Arc::new(primary.clone())));
        root.add_directory(StorageDirectory::new(Arc::new(overlay.clone())));
        (primary, overlay, root)
    }

    #[tokio::test]
    async fn test_first_directory_wins() {
        let (primary, overlay, root) = layered();
        primary.insert_file("rules.ini", b"game".to_vec());
        overlay.insert_file("rules.ini", b"mod".to_vec());
        overlay.insert_file("mod.ini", b"only mod".to_vec());

        assert_eq!(root.open_file("RULES.INI").await.unwrap().as_slice(), b"game");
        assert_eq!(&root.get_raw_file("mod.ini").await.unwrap()[..], b"only mod");
        assert!(root.contains_entry("MOD.INI").await.unwrap());
        assert!(!root.contains_entry("none.ini").await.unwrap());
    }

    #[tokio::test]
    async fn test_overlay_tried_only_after_not_found() {
        let (primary, overlay, root) = layered();
        overlay.insert_file("map.ini", b"m".to_vec());

        root.open_file("map.ini").await.unwrap();
        assert_eq!(primary.read_count(), 1);
        assert_eq!(overlay.read_count(), 1);
    }

    #[tokio::test]
    async fn test_io_error_stops_search() {
        let (primary, overlay, root) = layered();
        overlay.insert_file("map.ini", b"m".to_vec());
        primary.fail_reads(io::ErrorKind::PermissionDenied);

        let err = root.open_file("map.ini").await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::Io);
        assert_eq!(overlay.read_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_name_stops_search() {
        let (primary, overlay, root) = layered();
        overlay.insert_file("aux.ini", b"m".to_vec());
        primary.reserve_name("aux.ini");

        let err = root.open_file("aux.ini").await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NameNotAllowed);
        assert_eq!(overlay.read_count(), 0);

        let err = root.get_raw_file("aux.ini").await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NameNotAllowed);
        assert_eq!(overlay.read_count(), 0);
    }

    #[tokio::test]
    async fn test_not_found_lists_directories() {
        let (_, _, root) = layered();
        match root.open_file("missing.shp").await.unwrap_err() {
            StorageError::NotFound { name, searched } => {
                assert_eq!(name, "missing.shp");
                assert_eq!(searched, vec!["game".to_string(), "mod".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_writes_target_primary() {
        let (primary, overlay, root) = layered();
        root.write_file(&VirtualFile::from_text("save.sav", "s"), None)
            .await
            .unwrap();
        assert_eq!(primary.used_bytes(), 1);
        assert_eq!(overlay.used_bytes(), 0);

        let maps = root.get_or_create_directory("Maps").await.unwrap();
        assert_eq!(maps.name(), "Maps");
        assert_eq!(root.get_directory("maps").await.unwrap().name(), "Maps");
        root.delete_directory("maps", false).await.unwrap();

        root.delete_file("save.sav", false).await.unwrap();
        assert!(!root.contains_entry("save.sav").await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_concatenates() {
        let (primary, overlay, root) = layered();
        primary.insert_file("a.ini", b"a".to_vec());
        overlay.insert_file("a.ini", b"a".to_vec());
        overlay.insert_file("b.ini", b"b".to_vec());

        let names: Vec<String> = root.list_entries().try_collect().await.unwrap();
        assert_eq!(names, vec!["a.ini", "a.ini", "b.ini"]);
    }
}
