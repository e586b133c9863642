//! Error types for storage operations
//!
//! Every failure reduces to one of four kinds ([`StorageErrorKind`]). Search
//! operations across several sources only ever swallow
//! [`StorageErrorKind::NotFound`]; everything else stops the search.

use mixfs_formats::MixError;
use std::io;
use thiserror::Error;

/// Storage operation result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Coarse error taxonomy shared by every storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// Name does not exist in any searched source
    NotFound,
    /// Any other I/O or format failure
    Io,
    /// Backend refused the name itself
    NameNotAllowed,
    /// Backend ran out of space
    StorageQuota,
}

impl From<io::ErrorKind> for StorageErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::StorageFull
            | io::ErrorKind::QuotaExceeded
            | io::ErrorKind::FileTooLarge => Self::StorageQuota,
            io::ErrorKind::InvalidFilename => Self::NameNotAllowed,
            _ => Self::Io,
        }
    }
}

/// Errors from storage, archive and namespace operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Name not present in any searched source
    #[error("File not found: {name} (searched: {})", .searched.join(", "))]
    NotFound {
        /// Requested name
        name: String,
        /// Sources that were checked, in order
        searched: Vec<String>,
    },

    /// Host I/O failure
    #[error("I/O error on {name}: {source}")]
    Io {
        /// Entry the operation targeted
        name: String,
        /// Underlying host error
        #[source]
        source: io::Error,
    },

    /// Name rejected by the backend
    #[error("Name not allowed: {name}")]
    NameNotAllowed {
        /// Rejected name
        name: String,
    },

    /// Backend ran out of space
    #[error("Storage quota exceeded while writing {name}")]
    StorageQuota {
        /// Entry being written
        name: String,
    },

    /// Archive parse or read failure
    #[error("Archive error: {0}")]
    Archive(#[from] MixError),

    /// Caller-supplied parse step failed
    #[error("Failed to parse {name}: {source}")]
    Parse {
        /// File that was parsed
        name: String,
        /// Parser error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No storage capability could be acquired
    #[error("No storage available: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Map a host error for `name` onto the storage taxonomy
    pub fn from_io(name: impl Into<String>, err: io::Error) -> Self {
        let name = name.into();
        match StorageErrorKind::from(err.kind()) {
            StorageErrorKind::NotFound => Self::NotFound {
                name,
                searched: Vec::new(),
            },
            StorageErrorKind::StorageQuota => Self::StorageQuota { name },
            StorageErrorKind::NameNotAllowed => Self::NameNotAllowed { name },
            StorageErrorKind::Io => Self::Io { name, source: err },
        }
    }

    /// Not-found error listing the searched sources
    pub fn not_found(name: impl Into<String>, searched: Vec<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            searched,
        }
    }

    /// Reduce to the four-kind taxonomy
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            Self::NotFound { .. } => StorageErrorKind::NotFound,
            Self::NameNotAllowed { .. } => StorageErrorKind::NameNotAllowed,
            Self::StorageQuota { .. } => StorageErrorKind::StorageQuota,
            Self::Archive(err) if err.is_not_found() => StorageErrorKind::NotFound,
            Self::Io { .. }
            | Self::Archive(_)
            | Self::Parse { .. }
            | Self::Config(_)
            | Self::Unavailable(_) => StorageErrorKind::Io,
        }
    }

    /// True for soft misses that searches may skip over
    pub fn is_not_found(&self) -> bool {
        self.kind() == StorageErrorKind::NotFound
    }
}
