//! Precedence-ordered namespace over archives and storage
//!
//! Lookup order for a name:
//!
//! 1. standalone files registered from the primary storage directory
//! 2. archives, most recently registered first
//!
//! Archives contribute zero-copy views into their backing buffers. Nested
//! archives loaded with [`VirtualFileSystem::load_archive`] share the bytes
//! of the archive they were found in.

use crate::backend::{FsDirectory, MemoryDirectory};
use crate::config::VfsConfig;
use crate::directory::StorageDirectory;
use crate::error::{Result, StorageError};
use crate::provider::{FsProvider, MemoryProvider, StorageProvider, select_capability};
use crate::root::StorageRoot;
use futures::TryStreamExt;
use mixfs_formats::{MixArchive, MixParseOptions, VirtualFile};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Source label used for standalone files in not-found reports
const STORAGE_SOURCE: &str = "storage";

/// Namespace composed of archives and a storage root
#[derive(Debug, Clone)]
pub struct VirtualFileSystem {
    storage: Arc<StorageRoot>,
    /// Lowest priority first
    archives: Vec<(String, Arc<MixArchive>)>,
    /// Lowercased name to stored name
    standalone: HashMap<String, String>,
    /// Lowercased names
    exclusions: HashSet<String>,
    parse_options: MixParseOptions,
}

impl VirtualFileSystem {
    /// Create an empty namespace over `storage`
    pub fn new(storage: Arc<StorageRoot>) -> Self {
        Self {
            storage,
            archives: Vec::new(),
            standalone: HashMap::new(),
            exclusions: HashSet::new(),
            parse_options: MixParseOptions::default(),
        }
    }

    /// Options used by [`load_archive`](Self::load_archive)
    #[must_use]
    pub fn with_parse_options(mut self, options: MixParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Build a namespace from configuration
    ///
    /// Opens the root (falling back to memory when allowed) and overlays,
    /// loads the configured archives in order, then registers every other
    /// file in the root as a standalone override.
    pub async fn from_config(config: &VfsConfig) -> Result<Self> {
        config.validate()?;

        let mut providers: Vec<Box<dyn StorageProvider>> = Vec::new();
        if let Some(root) = &config.root {
            providers.push(Box::new(
                FsProvider::new(root).with_create(config.create_root),
            ));
        }
        if config.root.is_none() || config.memory_fallback {
            providers.push(Box::new(MemoryProvider::from_directory(
                MemoryDirectory::new("memory"),
            )));
        }

        let primary = StorageDirectory::new(select_capability(&providers).await?)
            .with_case_sensitive(config.case_sensitive)
            .with_chunk_size(config.write_chunk_size);
        let mut storage = StorageRoot::new(primary);

        for overlay in &config.overlays {
            let handle = FsDirectory::open(overlay, false)
                .await
                .map_err(|e| StorageError::from_io(overlay.display().to_string(), e))?;
            storage.add_directory(
                StorageDirectory::new(Arc::new(handle))
                    .with_case_sensitive(config.case_sensitive)
                    .with_chunk_size(config.write_chunk_size),
            );
        }

        let mut vfs = Self::new(Arc::new(storage)).with_parse_options(
            MixParseOptions::default().with_table_policy(config.table_policy),
        );

        for name in &config.archives {
            vfs.load_archive(name).await?;
        }

        let exclusions: Vec<&str> = config
            .archives
            .iter()
            .chain(&config.standalone_exclusions)
            .map(String::as_str)
            .collect();
        vfs.load_standalone_files(&exclusions).await?;

        Ok(vfs)
    }

    /// Shared storage root
    pub fn storage(&self) -> &Arc<StorageRoot> {
        &self.storage
    }

    /// Register an archive at the highest priority
    ///
    /// An archive already registered under `label` is replaced.
    pub fn add_archive(&mut self, archive: impl Into<Arc<MixArchive>>, label: impl Into<String>) {
        let label = label.into();
        let archive = archive.into();
        if self.remove_archive(&label).is_some() {
            debug!("Replacing archive {}", label);
        }
        info!(
            "Registered archive {} ({} entries, {})",
            label,
            archive.len(),
            archive.header_format()
        );
        self.archives.push((label, archive));
    }

    /// Resolve `name`, parse it as an archive and register it under that name
    ///
    /// The name goes through the namespace first, so archives nested in
    /// already registered archives stay zero-copy. Names the namespace does
    /// not know are read from the storage root.
    pub async fn load_archive(&mut self, name: &str) -> Result<Arc<MixArchive>> {
        let view = match self.open_file(name).await {
            Err(e) if e.is_not_found() => self.storage.open_file(name).await?,
            result => result?,
        };

        let archive = Arc::new(MixArchive::from_view_with_options(&view, self.parse_options)?);
        self.add_archive(Arc::clone(&archive), name);
        Ok(archive)
    }

    /// Unregister an archive
    pub fn remove_archive(&mut self, label: &str) -> Option<Arc<MixArchive>> {
        let index = self
            .archives
            .iter()
            .position(|(l, _)| l.eq_ignore_ascii_case(label))?;
        Some(self.archives.remove(index).1)
    }

    /// Registered archive by label
    pub fn archive(&self, label: &str) -> Option<&Arc<MixArchive>> {
        self.archives
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, archive)| archive)
    }

    /// True if an archive is registered under `label`
    pub fn has_archive(&self, label: &str) -> bool {
        self.archive(label).is_some()
    }

    /// Archive labels, highest priority first
    pub fn archive_labels(&self) -> Vec<&str> {
        self.archives
            .iter()
            .rev()
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// Register every file of the primary directory not in `exclude`
    ///
    /// Returns the number of files registered by this call.
    pub async fn load_standalone_files<S: AsRef<str>>(&mut self, exclude: &[S]) -> Result<usize> {
        self.exclusions
            .extend(exclude.iter().map(|name| name.as_ref().to_lowercase()));

        let files = self.storage.primary().list_files().await?;
        let mut added = 0;
        for name in files {
            let key = name.to_lowercase();
            if self.exclusions.contains(&key) || self.standalone.contains_key(&key) {
                continue;
            }
            self.standalone.insert(key, name);
            added += 1;
        }

        info!("Registered {} standalone files", added);
        Ok(added)
    }

    /// Register one more standalone file
    pub fn add_standalone_file(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.standalone.insert(name.to_lowercase(), name);
    }

    /// Registered standalone file names
    pub fn standalone_files(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.standalone.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// True if a standalone file or any archive provides `name`
    pub fn file_exists(&self, name: &str) -> bool {
        self.standalone.contains_key(&name.to_lowercase())
            || self
                .archives
                .iter()
                .any(|(_, archive)| archive.contains_file(name))
    }

    /// Resolve `name` by precedence
    pub async fn open_file(&self, name: &str) -> Result<VirtualFile> {
        let mut searched = Vec::new();

        if let Some(stored) = self.standalone.get(&name.to_lowercase()) {
            searched.push(STORAGE_SOURCE.to_string());
            match self.storage.open_file(stored).await {
                Ok(file) => {
                    debug!("Resolved {} from storage", name);
                    return Ok(file.with_name(name));
                }
                Err(e) if e.is_not_found() => {
                    debug!("Standalone file {} has vanished", stored);
                }
                Err(e) => return Err(e),
            }
        }

        for (label, archive) in self.archives.iter().rev() {
            searched.push(label.clone());
            match archive.open_file(name) {
                Ok(file) => {
                    debug!("Resolved {} from {}", name, label);
                    return Ok(file);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::not_found(name, searched))
    }

    /// Resolve `name` and run a parse step over it
    pub async fn open_file_typed<T, E, F>(&self, name: &str, parse: F) -> Result<T>
    where
        F: FnOnce(&VirtualFile) -> std::result::Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let file = self.open_file(name).await?;
        parse(&file).map_err(|e| StorageError::Parse {
            name: name.to_string(),
            source: e.into(),
        })
    }

    /// Names of every entry in the storage root, in search order
    pub async fn list_storage_entries(&self) -> Result<Vec<String>> {
        self.storage.list_entries().try_collect().await
    }
}
