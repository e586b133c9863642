//! Directory capability boundary
//!
//! A [`DirectoryHandle`] is the only way the storage layer touches host
//! storage. Backends report failures as plain [`std::io::Error`]s;
//! [`StorageDirectory`](crate::StorageDirectory) maps them onto the storage
//! error taxonomy.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use std::sync::Arc;

/// Kind of a directory child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Sub-directory
    Directory,
}

/// One child of a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostEntry {
    /// Child name as stored by the host
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
}

impl HostEntry {
    /// A file entry
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// A directory entry
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    /// True for files
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Stream of directory children
pub type EntryStream = BoxStream<'static, io::Result<HostEntry>>;

/// A host-granted directory
#[async_trait]
pub trait DirectoryHandle: Send + Sync + std::fmt::Debug {
    /// Directory name (for diagnostics)
    fn name(&self) -> &str;

    /// Enumerate the live children. Every call starts a fresh enumeration.
    async fn entries(&self) -> io::Result<EntryStream>;

    /// Read a child file whole
    async fn read_file(&self, name: &str) -> io::Result<Bytes>;

    /// Open a child directory, creating it when `create` is set
    async fn directory(&self, name: &str, create: bool) -> io::Result<Arc<dyn DirectoryHandle>>;

    /// Remove a child. Non-empty directories need `recursive`.
    async fn remove_entry(&self, name: &str, recursive: bool) -> io::Result<()>;

    /// Start writing a child file. Nothing is visible until
    /// [`WritableFile::close`] succeeds.
    async fn create_writable(&self, name: &str) -> io::Result<Box<dyn WritableFile>>;
}

/// An in-progress file write
#[async_trait]
pub trait WritableFile: Send {
    /// Append a chunk
    async fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Commit the file under its target name
    async fn close(&mut self) -> io::Result<()>;

    /// Discard everything written so far
    async fn abort(&mut self) -> io::Result<()>;
}

/// Reject names that could escape the directory or are never valid children
pub(crate) fn validate_name(name: &str) -> io::Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidFilename,
            format!("invalid entry name: {name:?}"),
        ));
    }
    Ok(())
}
