//! Case-resolving wrapper around one directory capability
//!
//! Game data refers to files by names whose case rarely matches what is on
//! disk. Unless a directory is marked case-sensitive, every name is resolved
//! against the live listing first: an exact match wins, otherwise the first
//! case-insensitive match is used, otherwise the name is kept as given.

use crate::error::{Result, StorageError};
use crate::handle::{DirectoryHandle, HostEntry};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use mixfs_formats::VirtualFile;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default chunk size for streamed writes
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 64 * 1024;

/// One host directory with case resolution and typed errors
#[derive(Debug, Clone)]
pub struct StorageDirectory {
    handle: Arc<dyn DirectoryHandle>,
    case_sensitive: bool,
    chunk_size: usize,
}

impl StorageDirectory {
    /// Wrap a directory capability (case-insensitive)
    pub fn new(handle: Arc<dyn DirectoryHandle>) -> Self {
        Self {
            handle,
            case_sensitive: false,
            chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
        }
    }

    /// Set case sensitivity
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set the chunk size used by [`write_file`](Self::write_file)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Directory name
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// True if names are matched exactly
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Underlying capability
    pub fn handle(&self) -> &Arc<dyn DirectoryHandle> {
        &self.handle
    }

    fn child(&self, handle: Arc<dyn DirectoryHandle>) -> Self {
        Self {
            handle,
            case_sensitive: self.case_sensitive,
            chunk_size: self.chunk_size,
        }
    }

    fn map_io(&self, name: &str) -> impl Fn(io::Error) -> StorageError + '_ {
        let name = name.to_string();
        move |e| match StorageError::from_io(name.clone(), e) {
            StorageError::NotFound { name, .. } => {
                StorageError::not_found(name, vec![self.name().to_string()])
            }
            other => other,
        }
    }

    /// Enumerate the live children. Each call starts a new enumeration.
    pub fn host_entries(&self) -> BoxStream<'static, Result<HostEntry>> {
        let handle = Arc::clone(&self.handle);
        let dir_name = handle.name().to_string();
        stream::once(async move { handle.entries().await })
            .try_flatten()
            .map_err(move |e| StorageError::from_io(dir_name.clone(), e))
            .boxed()
    }

    /// Enumerate child names
    pub fn list_entries(&self) -> BoxStream<'static, Result<String>> {
        self.host_entries().map_ok(|entry| entry.name).boxed()
    }

    /// Names of the child files
    pub async fn list_files(&self) -> Result<Vec<String>> {
        self.host_entries()
            .try_filter_map(|entry| async move { Ok(entry.is_file().then_some(entry.name)) })
            .try_collect()
            .await
    }

    /// Best-effort case correction; returns `name` unchanged if nothing matches
    pub async fn resolve_entry_name(&self, name: &str) -> Result<String> {
        if self.case_sensitive {
            return Ok(name.to_string());
        }

        let wanted = name.to_lowercase();
        let mut folded = None;
        let mut entries = self.host_entries();
        while let Some(entry) = entries.try_next().await? {
            if entry.name == name {
                return Ok(entry.name);
            }
            if folded.is_none() && entry.name.to_lowercase() == wanted {
                folded = Some(entry.name);
            }
        }

        if let Some(resolved) = &folded {
            debug!("Resolved {} to {} in {}", name, resolved, self.name());
        }
        Ok(folded.unwrap_or_else(|| name.to_string()))
    }

    /// Case correction unless `skip_case_fix` is set
    pub async fn fix_entry_case(&self, name: &str, skip_case_fix: bool) -> Result<String> {
        if skip_case_fix {
            return Ok(name.to_string());
        }
        self.resolve_entry_name(name).await
    }

    /// True if a child with this name exists
    pub async fn contains_entry(&self, name: &str) -> Result<bool> {
        let wanted = name.to_lowercase();
        let case_sensitive = self.case_sensitive;
        let mut entries = self.host_entries();
        while let Some(entry) = entries.try_next().await? {
            let matches = if case_sensitive {
                entry.name == name
            } else {
                entry.name.to_lowercase() == wanted
            };
            if matches {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read a file whole
    pub async fn get_raw_file(&self, name: &str, skip_case_fix: bool) -> Result<Bytes> {
        let resolved = self.fix_entry_case(name, skip_case_fix).await?;
        self.handle
            .read_file(&resolved)
            .await
            .map_err(self.map_io(&resolved))
    }

    /// Read a file into an owned view
    pub async fn open_file(&self, name: &str, skip_case_fix: bool) -> Result<VirtualFile> {
        let resolved = self.fix_entry_case(name, skip_case_fix).await?;
        let data = self
            .handle
            .read_file(&resolved)
            .await
            .map_err(self.map_io(&resolved))?;
        debug!("Opened {} from {} ({} bytes)", resolved, self.name(), data.len());
        Ok(VirtualFile::from_bytes(resolved, data))
    }

    /// Write a view, replacing any existing entry of the target name
    ///
    /// The target is `name_override` or the view's own name. Bytes are
    /// streamed in chunks; if any chunk fails the write is aborted and the
    /// error returned, leaving no partial file behind.
    pub async fn write_file(&self, view: &VirtualFile, name_override: Option<&str>) -> Result<()> {
        let target = name_override.unwrap_or_else(|| view.name());
        let resolved = self.fix_entry_case(target, false).await?;

        match self.handle.remove_entry(&resolved, false).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                return Err(self.map_io(&resolved)(e));
            }
            _ => {}
        }

        let mut writer = self
            .handle
            .create_writable(&resolved)
            .await
            .map_err(self.map_io(&resolved))?;

        for chunk in view.chunks(self.chunk_size) {
            if let Err(e) = writer.write(&chunk).await {
                if let Err(abort) = writer.abort().await {
                    warn!("Failed to abort write of {}: {}", resolved, abort);
                }
                return Err(self.map_io(&resolved)(e));
            }
        }

        writer.close().await.map_err(self.map_io(&resolved))?;
        debug!("Wrote {} to {} ({} bytes)", resolved, self.name(), view.size());
        Ok(())
    }

    /// Delete a file; already-absent targets are fine when `skip_case_fix` is set
    pub async fn delete_file(&self, name: &str, skip_case_fix: bool) -> Result<()> {
        let resolved = self.fix_entry_case(name, skip_case_fix).await?;
        match self.handle.remove_entry(&resolved, false).await {
            Ok(()) => Ok(()),
            Err(e) if skip_case_fix && e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.map_io(&resolved)(e)),
        }
    }

    /// Open an existing child directory
    pub async fn get_directory(&self, name: &str) -> Result<Self> {
        let resolved = self.resolve_entry_name(name).await?;
        let handle = self
            .handle
            .directory(&resolved, false)
            .await
            .map_err(self.map_io(&resolved))?;
        Ok(self.child(handle))
    }

    /// Open a child directory, creating it if needed
    pub async fn get_or_create_directory(&self, name: &str) -> Result<Self> {
        let resolved = self.resolve_entry_name(name).await?;
        let handle = self
            .handle
            .directory(&resolved, true)
            .await
            .map_err(self.map_io(&resolved))?;
        Ok(self.child(handle))
    }

    /// Remove a child directory; non-empty ones need `recursive`
    pub async fn delete_directory(&self, name: &str, recursive: bool) -> Result<()> {
        let resolved = self.resolve_entry_name(name).await?;
        self.handle
            .remove_entry(&resolved, recursive)
            .await
            .map_err(self.map_io(&resolved))
    }
}
