//! In-process directory tree
//!
//! Used when no host directory is available and as a test double. The
//! whole tree shares one quota and one set of injected faults.

use crate::handle::{DirectoryHandle, EntryStream, HostEntry, WritableFile, validate_name};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Node {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeMap<String, Arc<RwLock<Node>>>,
}

impl Node {
    fn size(&self) -> usize {
        self.files.values().map(Bytes::len).sum::<usize>()
            + self.dirs.values().map(|d| d.read().size()).sum::<usize>()
    }

    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

#[derive(Debug, Default)]
struct Faults {
    read_error: Option<io::ErrorKind>,
    write_limit: Option<usize>,
    reserved: HashSet<String>,
}

#[derive(Debug, Default)]
struct Shared {
    quota: Option<usize>,
    used: AtomicUsize,
    reads: AtomicUsize,
    faults: Mutex<Faults>,
}

/// A directory in an in-memory tree
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    name: String,
    node: Arc<RwLock<Node>>,
    shared: Arc<Shared>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryDirectory {
    /// Create an empty tree
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: Arc::default(),
            shared: Arc::default(),
        }
    }

    /// Create an empty tree limited to `bytes` of file data
    pub fn with_quota(name: impl Into<String>, bytes: usize) -> Self {
        Self {
            name: name.into(),
            node: Arc::default(),
            shared: Arc::new(Shared {
                quota: Some(bytes),
                ..Shared::default()
            }),
        }
    }

    /// Store a file directly, bypassing quota and faults
    pub fn insert_file(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        let data = data.into();
        self.shared.used.fetch_add(data.len(), Ordering::Relaxed);
        if let Some(old) = self.node.write().files.insert(name.into(), data) {
            self.shared.used.fetch_sub(old.len(), Ordering::Relaxed);
        }
    }

    /// Fail every file read in the tree with `kind`
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.shared.faults.lock().read_error = Some(kind);
    }

    /// Fail writes once a single file exceeds `bytes`
    pub fn fail_writes_after(&self, bytes: usize) {
        self.shared.faults.lock().write_limit = Some(bytes);
    }

    /// Reject `name` everywhere in the tree
    pub fn reserve_name(&self, name: impl Into<String>) {
        self.shared.faults.lock().reserved.insert(name.into());
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        *self.shared.faults.lock() = Faults::default();
    }

    /// Number of file reads attempted in the tree
    pub fn read_count(&self) -> usize {
        self.shared.reads.load(Ordering::Relaxed)
    }

    /// Bytes of file data stored in the tree
    pub fn used_bytes(&self) -> usize {
        self.shared.used.load(Ordering::Relaxed)
    }

    fn check_name(&self, name: &str) -> io::Result<()> {
        validate_name(name)?;
        if self.shared.faults.lock().reserved.contains(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidFilename,
                format!("reserved entry name: {name}"),
            ));
        }
        Ok(())
    }

    fn not_found(&self, name: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{name} not found in {}", self.name),
        )
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> io::Result<EntryStream> {
        let node = self.node.read();
        let entries: Vec<io::Result<HostEntry>> = node
            .dirs
            .keys()
            .map(|name| Ok(HostEntry::directory(name.clone())))
            .chain(node.files.keys().map(|name| Ok(HostEntry::file(name.clone()))))
            .collect();
        Ok(stream::iter(entries).boxed())
    }

    async fn read_file(&self, name: &str) -> io::Result<Bytes> {
        self.check_name(name)?;
        self.shared.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(kind) = self.shared.faults.lock().read_error {
            return Err(io::Error::new(kind, format!("injected read fault on {name}")));
        }

        let node = self.node.read();
        if let Some(data) = node.files.get(name) {
            return Ok(data.clone());
        }
        if node.dirs.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{name} is a directory"),
            ));
        }
        Err(self.not_found(name))
    }

    async fn directory(&self, name: &str, create: bool) -> io::Result<Arc<dyn DirectoryHandle>> {
        self.check_name(name)?;
        let mut node = self.node.write();

        let child = if let Some(child) = node.dirs.get(name) {
            Arc::clone(child)
        } else if node.files.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{name} is a file"),
            ));
        } else if create {
            let child = Arc::new(RwLock::new(Node::default()));
            node.dirs.insert(name.to_string(), Arc::clone(&child));
            child
        } else {
            return Err(self.not_found(name));
        };

        Ok(Arc::new(Self {
            name: name.to_string(),
            node: child,
            shared: Arc::clone(&self.shared),
        }))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> io::Result<()> {
        self.check_name(name)?;
        let mut node = self.node.write();

        if let Some(data) = node.files.remove(name) {
            self.shared.used.fetch_sub(data.len(), Ordering::Relaxed);
            return Ok(());
        }

        let Some(child) = node.dirs.get(name) else {
            return Err(self.not_found(name));
        };
        let (empty, size) = {
            let child = child.read();
            (child.is_empty(), child.size())
        };
        if !empty && !recursive {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("{name} is not empty"),
            ));
        }
        node.dirs.remove(name);
        self.shared.used.fetch_sub(size, Ordering::Relaxed);
        Ok(())
    }

    async fn create_writable(&self, name: &str) -> io::Result<Box<dyn WritableFile>> {
        self.check_name(name)?;
        if self.node.read().dirs.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{name} is a directory"),
            ));
        }

        Ok(Box::new(MemoryWritable {
            name: name.to_string(),
            buffer: Some(Vec::new()),
            node: Arc::clone(&self.node),
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Pending write buffered until close
struct MemoryWritable {
    name: String,
    buffer: Option<Vec<u8>>,
    node: Arc<RwLock<Node>>,
    shared: Arc<Shared>,
}

impl MemoryWritable {
    fn buffer(&mut self) -> io::Result<&mut Vec<u8>> {
        self.buffer
            .as_mut()
            .ok_or_else(|| io::Error::other("write already finished"))
    }
}

#[async_trait]
impl WritableFile for MemoryWritable {
    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        let limit = self.shared.faults.lock().write_limit;
        let quota = self.shared.quota;
        let used = self.shared.used.load(Ordering::Relaxed);
        let name = self.name.clone();
        let buffer = self.buffer()?;
        let pending = buffer.len() + chunk.len();

        if limit.is_some_and(|limit| pending > limit) {
            return Err(io::Error::other(format!("injected write fault on {name}")));
        }
        if quota.is_some_and(|quota| used + pending > quota) {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                format!("quota exhausted writing {name}"),
            ));
        }

        buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        let data = Bytes::from(
            self.buffer
                .take()
                .ok_or_else(|| io::Error::other("write already finished"))?,
        );

        self.shared.used.fetch_add(data.len(), Ordering::Relaxed);
        if let Some(old) = self.node.write().files.insert(self.name.clone(), data) {
            self.shared.used.fetch_sub(old.len(), Ordering::Relaxed);
        }
        Ok(())
    }

    async fn abort(&mut self) -> io::Result<()> {
        self.buffer = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn write(dir: &MemoryDirectory, name: &str, data: &[u8]) -> io::Result<()> {
        let mut writer = dir.create_writable(name).await?;
        if let Err(e) = writer.write(data).await {
            writer.abort().await?;
            return Err(e);
        }
        writer.close().await
    }

    #[tokio::test]
    async fn test_write_and_list() {
        let dir = MemoryDirectory::new("root");
        write(&dir, "b.txt", b"bb").await.unwrap();
        dir.directory("maps", true).await.unwrap();
        dir.insert_file("a.txt", b"a".to_vec());

        let entries: Vec<HostEntry> = dir.entries().await.unwrap().try_collect().await.unwrap();
        assert_eq!(
            entries,
            vec![
                HostEntry::directory("maps"),
                HostEntry::file("a.txt"),
                HostEntry::file("b.txt"),
            ]
        );
        assert_eq!(dir.used_bytes(), 3);
    }

    #[tokio::test]
    async fn test_quota() {
        let dir = MemoryDirectory::with_quota("small", 4);
        write(&dir, "a.bin", &[0; 3]).await.unwrap();

        let err = write(&dir, "b.bin", &[0; 2]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
        assert!(dir.read_file("b.bin").await.is_err());

        dir.remove_entry("a.bin", false).await.unwrap();
        write(&dir, "b.bin", &[0; 4]).await.unwrap();
        assert_eq!(dir.used_bytes(), 4);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let dir = MemoryDirectory::new("faulty");
        dir.insert_file("a.bin", vec![1u8]);

        dir.fail_reads(io::ErrorKind::PermissionDenied);
        assert_eq!(
            dir.read_file("a.bin").await.unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert_eq!(dir.read_count(), 1);

        dir.clear_faults();
        dir.reserve_name("con");
        assert_eq!(
            dir.read_file("con").await.unwrap_err().kind(),
            io::ErrorKind::InvalidFilename
        );
        assert_eq!(&dir.read_file("a.bin").await.unwrap()[..], &[1]);
    }

    #[tokio::test]
    async fn test_remove_directory() {
        let dir = MemoryDirectory::new("root");
        let child = dir.directory("sub", true).await.unwrap();
        let mut writer = child.create_writable("x").await.unwrap();
        writer.write(b"xyz").await.unwrap();
        writer.close().await.unwrap();
        assert_eq!(dir.used_bytes(), 3);

        assert_eq!(
            dir.remove_entry("sub", false).await.unwrap_err().kind(),
            io::ErrorKind::DirectoryNotEmpty
        );
        dir.remove_entry("sub", true).await.unwrap();
        assert_eq!(dir.used_bytes(), 0);
        assert_eq!(
            dir.remove_entry("sub", true).await.unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
