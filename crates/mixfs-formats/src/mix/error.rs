//! Error types for mix archive operations

use crate::virtual_file::ViewError;
use mixfs_crypto::CryptoError;
use thiserror::Error;

/// Mix operation result type
pub type MixResult<T> = Result<T, MixError>;

/// Errors raised while parsing, reading or building mix archives
#[derive(Debug, Error)]
pub enum MixError {
    /// No entry with the requested name hash
    #[error("File not found in archive: {name} ({hash:08X})")]
    NotFound {
        /// Requested name (empty for hash lookups)
        name: String,
        /// Hash that was looked up
        hash: u32,
    },

    /// Stream ends before the fixed header is complete
    #[error("Truncated header: need {needed} bytes, got {available}")]
    TruncatedHeader {
        /// Bytes required for the header
        needed: usize,
        /// Bytes present in the stream
        available: usize,
    },

    /// Entry table is shorter than the declared count (strict parsing only)
    #[error("Truncated entry table: {declared} entries declared, {readable} readable")]
    TruncatedTable {
        /// Count from the header
        declared: u16,
        /// Complete records present in the stream
        readable: usize,
    },

    /// Entry points past the end of the archive stream
    #[error(
        "Entry {hash:08X} out of bounds: {offset}+{length} past data start {data_start} exceeds {archive_size} bytes"
    )]
    EntryOutOfBounds {
        /// Entry hash
        hash: u32,
        /// Offset relative to the data region
        offset: u32,
        /// Entry length
        length: u32,
        /// Absolute start of the data region
        data_start: usize,
        /// Size of the archive stream
        archive_size: usize,
    },

    /// More entries than the 16-bit count can hold
    #[error("Too many entries: {0} (maximum 65535)")]
    TooManyEntries(usize),

    /// Data region exceeds the 32-bit size field
    #[error("Archive data too large: {0} bytes")]
    DataTooLarge(usize),

    /// Two builder entries share a hash
    #[error("Duplicate entry hash: {0:08X}")]
    DuplicateEntry(u32),

    /// Header key unwrap or decryption failure
    #[error("Header decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// View construction failure
    #[error("View error: {0}")]
    View(#[from] ViewError),

    /// Binary record parsing failure
    #[error("Binary parsing error: {0}")]
    BinRead(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MixError {
    /// True when the error means "no such entry"
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
