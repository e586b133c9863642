//! Ranked storage capability selection
//!
//! Callers list the providers they are willing to use, best first.
//! [`select_capability`] returns the first handle that can be acquired and
//! logs every provider that failed on the way.

use crate::backend::{FsDirectory, MemoryDirectory};
use crate::error::{Result, StorageError, StorageErrorKind};
use crate::handle::DirectoryHandle;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Source of a root directory capability
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider name for diagnostics
    fn name(&self) -> String;

    /// Try to acquire the directory
    async fn acquire(&self) -> io::Result<Arc<dyn DirectoryHandle>>;
}

/// Host directory provider
#[derive(Debug, Clone)]
pub struct FsProvider {
    path: PathBuf,
    create: bool,
}

impl FsProvider {
    /// Provider for an existing directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create: false,
        }
    }

    /// Create the directory if it is missing
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }
}

#[async_trait]
impl StorageProvider for FsProvider {
    fn name(&self) -> String {
        format!("fs:{}", self.path.display())
    }

    async fn acquire(&self) -> io::Result<Arc<dyn DirectoryHandle>> {
        Ok(Arc::new(FsDirectory::open(&self.path, self.create).await?))
    }
}

/// In-memory provider, always available
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    directory: MemoryDirectory,
}

impl MemoryProvider {
    /// Provider backed by a fresh in-memory tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider handing out an existing tree
    pub fn from_directory(directory: MemoryDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> String {
        format!("memory:{}", self.directory.name())
    }

    async fn acquire(&self) -> io::Result<Arc<dyn DirectoryHandle>> {
        Ok(Arc::new(self.directory.clone()))
    }
}

/// Acquire a directory from the first provider that succeeds
pub async fn select_capability(
    providers: &[Box<dyn StorageProvider>],
) -> Result<Arc<dyn DirectoryHandle>> {
    let mut failures = Vec::with_capacity(providers.len());

    for provider in providers {
        let name = provider.name();
        match provider.acquire().await {
            Ok(handle) => {
                info!("Using storage provider {}", name);
                return Ok(handle);
            }
            Err(e) => {
                let kind = StorageErrorKind::from(e.kind());
                warn!("Storage provider {} unavailable ({:?}): {}", name, kind, e);
                failures.push(format!("{name}: {e}"));
            }
        }
    }

    if failures.is_empty() {
        return Err(StorageError::Unavailable("no providers configured".to_string()));
    }
    Err(StorageError::Unavailable(failures.join("; ")))
}
