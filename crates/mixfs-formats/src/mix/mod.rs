//! Westwood mix archives
//!
//! A mix archive is a flat container indexed purely by 32-bit filename
//! hashes. No names are stored, so the only way to find a file is to hash
//! the name you are looking for (see [`mixfs_crypto::hash_name`]).
//!
//! [`MixArchive`] keeps a shared [`Bytes`] handle to the whole stream and
//! hands out zero-copy [`VirtualFile`] views. Nested archives parse straight
//! out of such a view without copying.

mod builder;
mod entry;
mod error;
mod header;
mod parser;

pub use builder::MixBuilder;
pub use entry::{ENTRY_SIZE, MixEntry};
pub use error::{MixError, MixResult};
pub use header::{
    ENCRYPTED_PREAMBLE_SIZE, FLAG_CHECKSUM, FLAG_ENCRYPTED, FLAGS_SIZE, HEADER_SIZE, MixHeader,
    MixHeaderFormat,
};
pub use parser::{MixParseOptions, TablePolicy};

use crate::virtual_file::VirtualFile;
use bytes::Bytes;
use memmap2::MmapOptions;
use mixfs_crypto::hash_name;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// A parsed mix archive
#[derive(Debug, Clone)]
pub struct MixArchive {
    data: Bytes,
    format: MixHeaderFormat,
    flags: u32,
    header: MixHeader,
    data_start: usize,
    truncated: bool,
    index: HashMap<u32, MixEntry>,
}

impl MixArchive {
    /// Parse an archive with the default (lenient) options
    pub fn parse(data: impl Into<Bytes>) -> MixResult<Self> {
        Self::parse_with_options(data, MixParseOptions::default())
    }

    /// Parse an archive
    pub fn parse_with_options(data: impl Into<Bytes>, options: MixParseOptions) -> MixResult<Self> {
        let data = data.into();
        let table = parser::parse_table(&data, options)?;

        let mut index = HashMap::with_capacity(table.entries.len());
        for entry in table.entries {
            if let Some(previous) = index.insert(entry.hash, entry) {
                debug!(
                    "Duplicate hash {:08X}: {}+{} replaced by {}+{}",
                    entry.hash, previous.offset, previous.length, entry.offset, entry.length
                );
            }
        }

        debug!(
            "Parsed {} mix: {} entries, data at {}",
            table.format,
            index.len(),
            table.data_start
        );

        Ok(Self {
            data,
            format: table.format,
            flags: table.flags,
            header: table.header,
            data_start: table.data_start,
            truncated: table.truncated,
            index,
        })
    }

    /// Parse an archive stored inside another view, sharing its bytes
    pub fn from_view(view: &VirtualFile) -> MixResult<Self> {
        Self::from_view_with_options(view, MixParseOptions::default())
    }

    /// Parse an archive stored inside another view
    pub fn from_view_with_options(view: &VirtualFile, options: MixParseOptions) -> MixResult<Self> {
        Self::parse_with_options(view.bytes(), options)
    }

    /// Memory-map and parse a host file
    pub fn open(path: impl AsRef<Path>) -> MixResult<Self> {
        Self::open_with_options(path, MixParseOptions::default())
    }

    /// Memory-map and parse a host file
    pub fn open_with_options(path: impl AsRef<Path>, options: MixParseOptions) -> MixResult<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Self::parse_with_options(Bytes::new(), options);
        }

        // SAFETY: the map is read-only and archives are not modified while open
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        debug!("Mapped {} ({} bytes)", path.as_ref().display(), mmap.len());
        Self::parse_with_options(Bytes::from_owner(mmap), options)
    }

    /// Check for a file by name
    pub fn contains_file(&self, name: &str) -> bool {
        self.contains_hash(hash_name(name))
    }

    /// Check for a file by hash
    pub fn contains_hash(&self, hash: u32) -> bool {
        self.index.contains_key(&hash)
    }

    /// Look up an entry by name
    pub fn entry(&self, name: &str) -> Option<&MixEntry> {
        self.entry_by_hash(hash_name(name))
    }

    /// Look up an entry by hash
    pub fn entry_by_hash(&self, hash: u32) -> Option<&MixEntry> {
        self.index.get(&hash)
    }

    /// Open a file by name as a zero-copy view
    pub fn open_file(&self, name: &str) -> MixResult<VirtualFile> {
        self.open_by_hash(hash_name(name), name)
    }

    /// Open a file by hash, naming the resulting view `name`
    pub fn open_by_hash(&self, hash: u32, name: &str) -> MixResult<VirtualFile> {
        let entry = self.index.get(&hash).ok_or_else(|| MixError::NotFound {
            name: name.to_string(),
            hash,
        })?;

        let out_of_bounds = || MixError::EntryOutOfBounds {
            hash,
            offset: entry.offset,
            length: entry.length,
            data_start: self.data_start,
            archive_size: self.data.len(),
        };

        let offset = usize::try_from(entry.offset)
            .ok()
            .and_then(|offset| offset.checked_add(self.data_start))
            .ok_or_else(out_of_bounds)?;
        let length = usize::try_from(entry.length).map_err(|_| out_of_bounds())?;

        VirtualFile::from_slice(name, &self.data, offset, length).map_err(|_| out_of_bounds())
    }

    /// Entries sorted by offset
    pub fn entries(&self) -> Vec<MixEntry> {
        let mut entries: Vec<MixEntry> = self.index.values().copied().collect();
        entries.sort_by_key(|e| (e.offset, e.hash));
        entries
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Detected header layout
    pub const fn header_format(&self) -> MixHeaderFormat {
        self.format
    }

    /// Raw flag word (zero for legacy archives)
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// True if the checksum flag is set
    pub const fn has_checksum(&self) -> bool {
        self.flags & FLAG_CHECKSUM != 0
    }

    /// True if the entry table was encrypted
    pub const fn is_encrypted(&self) -> bool {
        matches!(self.format, MixHeaderFormat::Encrypted)
    }

    /// Entry count from the header
    pub const fn declared_count(&self) -> u16 {
        self.header.file_count
    }

    /// Data size from the header
    pub const fn declared_data_size(&self) -> u32 {
        self.header.data_size
    }

    /// True if the entry table ended early under the lenient policy
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Absolute offset of the data region
    pub const fn data_start(&self) -> usize {
        self.data_start
    }

    /// Bytes available in the data region
    pub fn data_size(&self) -> usize {
        self.data.len().saturating_sub(self.data_start)
    }

    /// Total stream size
    pub fn archive_size(&self) -> usize {
        self.data.len()
    }

    /// The shared backing stream
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Match candidate names against the stored hashes
    pub fn identify<'a, I>(&self, names: I) -> HashMap<u32, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| (hash_name(name), name))
            .filter(|(hash, _)| self.index.contains_key(hash))
            .map(|(hash, name)| (hash, name.to_string()))
            .collect()
    }
}
