//! Mix archive builder
//!
//! Produces archives in any of the three header layouts. Entry records are
//! written sorted by signed hash, which is the order the game binary-searches
//! in. File data is laid out back to back in insertion order.
//!
//! # Example
//!
//! ```rust
//! use mixfs_formats::mix::{MixArchive, MixBuilder, MixHeaderFormat};
//!
//! # fn example() -> Result<(), mixfs_formats::mix::MixError> {
//! let mut builder = MixBuilder::new().with_format(MixHeaderFormat::Extended);
//! builder.add_file("rules.ini", b"[General]".to_vec())?;
//! builder.add_file("art.ini", b"[Art]".to_vec())?;
//!
//! let archive = MixArchive::parse(builder.build()?)?;
//! assert!(archive.contains_file("RULES.INI"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use super::entry::MixEntry;
use super::error::{MixError, MixResult};
use super::header::{FLAG_CHECKSUM, FLAG_ENCRYPTED, MixHeader, MixHeaderFormat};
use binrw::BinWrite;
use bytes::Bytes;
use mixfs_crypto::{BlowfishCipher, WRAPPED_KEY_SIZE, hash_name, round_up_to_block, unwrap_key};
use std::collections::HashSet;
use std::io::Cursor;

/// Builder for mix archives
#[derive(Debug, Clone)]
pub struct MixBuilder {
    format: MixHeaderFormat,
    checksum_flag: bool,
    key_source: [u8; WRAPPED_KEY_SIZE],
    files: Vec<(u32, Bytes)>,
    hashes: HashSet<u32>,
}

impl Default for MixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MixBuilder {
    /// Create a builder producing legacy archives
    pub fn new() -> Self {
        Self {
            format: MixHeaderFormat::Legacy,
            checksum_flag: false,
            key_source: [0; WRAPPED_KEY_SIZE],
            files: Vec::new(),
            hashes: HashSet::new(),
        }
    }

    /// Choose the header layout
    pub const fn with_format(mut self, format: MixHeaderFormat) -> Self {
        self.format = format;
        self
    }

    /// Produce an encrypted archive whose Blowfish key is unwrapped from `key_source`
    pub const fn with_key_source(mut self, key_source: [u8; WRAPPED_KEY_SIZE]) -> Self {
        self.format = MixHeaderFormat::Encrypted;
        self.key_source = key_source;
        self
    }

    /// Set the checksum flag bit (flagged layouts only, no digest is written)
    pub const fn with_checksum_flag(mut self, enabled: bool) -> Self {
        self.checksum_flag = enabled;
        self
    }

    /// Add a file under its name hash
    pub fn add_file(&mut self, name: &str, data: impl Into<Bytes>) -> MixResult<u32> {
        let hash = hash_name(name);
        self.add_hashed(hash, data)?;
        Ok(hash)
    }

    /// Add a file under a raw hash
    pub fn add_hashed(&mut self, hash: u32, data: impl Into<Bytes>) -> MixResult<()> {
        if !self.hashes.insert(hash) {
            return Err(MixError::DuplicateEntry(hash));
        }
        self.files.push((hash, data.into()));
        Ok(())
    }

    /// Number of files added
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if no files were added
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entry table as it will be written
    pub fn entries(&self) -> MixResult<Vec<MixEntry>> {
        let mut entries = Vec::with_capacity(self.files.len());
        let mut offset = 0usize;
        for (hash, data) in &self.files {
            let start = u32::try_from(offset).map_err(|_| MixError::DataTooLarge(offset))?;
            let length =
                u32::try_from(data.len()).map_err(|_| MixError::DataTooLarge(data.len()))?;
            entries.push(MixEntry::new(*hash, start, length));
            offset += data.len();
        }
        entries.sort_by_key(MixEntry::sort_key);
        Ok(entries)
    }

    /// Serialize the archive
    pub fn build(&self) -> MixResult<Vec<u8>> {
        let file_count =
            u16::try_from(self.files.len()).map_err(|_| MixError::TooManyEntries(self.files.len()))?;
        let total: usize = self.files.iter().map(|(_, data)| data.len()).sum();
        let data_size = u32::try_from(total).map_err(|_| MixError::DataTooLarge(total))?;

        let mut table = Cursor::new(Vec::new());
        MixHeader {
            file_count,
            data_size,
        }
        .write_le(&mut table)?;
        for entry in self.entries()? {
            entry.write_le(&mut table)?;
        }
        let mut table = table.into_inner();

        let checksum = if self.checksum_flag { FLAG_CHECKSUM } else { 0 };
        let mut out = Vec::with_capacity(table.len() + total + 96);
        match self.format {
            MixHeaderFormat::Legacy => out.extend_from_slice(&table),
            MixHeaderFormat::Extended => {
                out.extend_from_slice(&checksum.to_le_bytes());
                out.extend_from_slice(&table);
            }
            MixHeaderFormat::Encrypted => {
                let key = unwrap_key(&self.key_source)?;
                let cipher = BlowfishCipher::new(&key)?;
                table.resize(round_up_to_block(table.len()), 0);
                cipher.encrypt_blocks(&mut table)?;

                out.extend_from_slice(&(FLAG_ENCRYPTED | checksum).to_le_bytes());
                out.extend_from_slice(&self.key_source);
                out.extend_from_slice(&table);
            }
        }

        for (_, data) in &self.files {
            out.extend_from_slice(data);
        }
        Ok(out)
    }
}
