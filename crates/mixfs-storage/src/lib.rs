//! Layered virtual filesystem for Westwood game assets
//!
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::future_not_send)] // Generic exclusion lists
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! Game files live in three kinds of places: the game directory (plus mod
//! or map overlays), mix archives (possibly nested inside each other), and
//! a writable local cache. This crate composes them into one namespace.
//!
//! # Components
//!
//! - [`DirectoryHandle`]: the host directory capability boundary, with
//!   [`FsDirectory`] and [`MemoryDirectory`] backends
//! - [`StorageDirectory`]: case-resolving wrapper with typed errors
//! - [`StorageRoot`]: primary directory plus search overlays
//! - [`VirtualFileSystem`]: standalone files over archives, newest archive first
//!
//! # Example
//!
//! ```rust,no_run
//! use mixfs_storage::{VfsConfig, VirtualFileSystem};
//!
//! # async fn example() -> mixfs_storage::Result<()> {
//! let config = VfsConfig::new("/games/ra2")
//!     .with_archive("ra2.mix")
//!     .with_archive("local.mix");
//! let vfs = VirtualFileSystem::from_config(&config).await?;
//!
//! let rules = vfs.open_file("rules.ini").await?;
//! println!("rules.ini: {} bytes", rules.size());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod directory;
pub mod error;
pub mod handle;
pub mod provider;
pub mod root;
pub mod vfs;

pub use backend::{FsDirectory, MemoryDirectory};
pub use config::VfsConfig;
pub use directory::{DEFAULT_WRITE_CHUNK_SIZE, StorageDirectory};
pub use error::{Result, StorageError, StorageErrorKind};
pub use handle::{DirectoryHandle, EntryKind, EntryStream, HostEntry, WritableFile};
pub use provider::{FsProvider, MemoryProvider, StorageProvider, select_capability};
pub use root::StorageRoot;
pub use vfs::VirtualFileSystem;

// Re-export the view type every lookup returns
pub use mixfs_formats::{TextEncoding, VirtualFile};
