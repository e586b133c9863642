//! Host filesystem backend
//!
//! Writes land in a hidden sibling temp file that is renamed over the
//! target on close, so readers never observe a partial file. Temp files are
//! left out of listings.

use crate::handle::{DirectoryHandle, EntryKind, EntryStream, HostEntry, WritableFile, validate_name};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Prefix of in-progress write files
const TEMP_PREFIX: &str = ".mixfs-tmp-";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A directory on the host filesystem
#[derive(Debug, Clone)]
pub struct FsDirectory {
    path: PathBuf,
    name: String,
}

impl FsDirectory {
    /// Open an existing directory, or create it when `create` is set
    pub async fn open(path: impl Into<PathBuf>, create: bool) -> io::Result<Self> {
        let path = path.into();
        if create {
            fs::create_dir_all(&path).await?;
        }

        let metadata = fs::metadata(&path).await?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", path.display()),
            ));
        }

        Ok(Self::from_path(path))
    }

    fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { path, name }
    }

    /// Host path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn child(&self, name: &str) -> io::Result<PathBuf> {
        validate_name(name)?;
        if name.starts_with(TEMP_PREFIX) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidFilename,
                format!("reserved entry name: {name}"),
            ));
        }
        Ok(self.path.join(name))
    }
}

#[async_trait]
impl DirectoryHandle for FsDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn entries(&self) -> io::Result<EntryStream> {
        let read_dir = fs::read_dir(&self.path).await?;

        let entries = stream::unfold(read_dir, |mut read_dir| async move {
            loop {
                let entry = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => return None,
                    Err(e) => return Some((Err(e), read_dir)),
                };

                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(TEMP_PREFIX) {
                    continue;
                }

                let kind = match entry.file_type().await {
                    Ok(file_type) if file_type.is_dir() => EntryKind::Directory,
                    Ok(_) => EntryKind::File,
                    Err(e) => return Some((Err(e), read_dir)),
                };
                return Some((Ok(HostEntry { name, kind }), read_dir));
            }
        });

        Ok(entries.boxed())
    }

    async fn read_file(&self, name: &str) -> io::Result<Bytes> {
        let path = self.child(name)?;
        let data = fs::read(&path).await?;
        debug!("Read {} ({} bytes)", path.display(), data.len());
        Ok(Bytes::from(data))
    }

    async fn directory(&self, name: &str, create: bool) -> io::Result<Arc<dyn DirectoryHandle>> {
        let path = self.child(name)?;
        if create {
            match fs::create_dir(&path).await {
                Ok(()) => debug!("Created directory {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Arc::new(Self::open(path, false).await?))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> io::Result<()> {
        let path = self.child(name)?;
        let metadata = fs::symlink_metadata(&path).await?;
        if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_dir(&path).await
            }
        } else {
            fs::remove_file(&path).await
        }
    }

    async fn create_writable(&self, name: &str) -> io::Result<Box<dyn WritableFile>> {
        let target = self.child(name)?;
        // Temp names must not grow with the target name
        let temp = self.path.join(format!(
            "{TEMP_PREFIX}{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let file = fs::File::create(&temp).await?;

        Ok(Box::new(FsWritable {
            file: Some(file),
            temp,
            target,
        }))
    }
}

/// Pending write to a temp file
struct FsWritable {
    file: Option<fs::File>,
    temp: PathBuf,
    target: PathBuf,
}

impl FsWritable {
    fn file(&mut self) -> io::Result<&mut fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("write already finished"))
    }

    async fn discard(&mut self) -> io::Result<()> {
        self.file = None;
        match fs::remove_file(&self.temp).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl WritableFile for FsWritable {
    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file()?.write_all(chunk).await
    }

    async fn close(&mut self) -> io::Result<()> {
        let commit = async {
            let file = self.file()?;
            file.flush().await?;
            file.sync_all().await?;
            self.file = None;
            fs::rename(&self.temp, &self.target).await
        };

        if let Err(e) = commit.await {
            if let Err(cleanup) = self.discard().await {
                warn!("Failed to remove {}: {}", self.temp.display(), cleanup);
            }
            return Err(e);
        }
        debug!("Wrote {}", self.target.display());
        Ok(())
    }

    async fn abort(&mut self) -> io::Result<()> {
        self.discard().await
    }
}
