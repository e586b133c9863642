//! Entry table records

use binrw::{BinRead, BinWrite};

/// Size of one entry record
pub const ENTRY_SIZE: usize = 12;

/// One record of the entry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
#[brw(little)]
pub struct MixEntry {
    /// Filename hash
    pub hash: u32,
    /// Offset relative to the start of the data region
    pub offset: u32,
    /// Length in bytes
    pub length: u32,
}

impl MixEntry {
    /// Create a new entry
    pub const fn new(hash: u32, offset: u32, length: u32) -> Self {
        Self {
            hash,
            offset,
            length,
        }
    }

    /// End of the entry relative to the data region
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    /// Hash as the signed value the tables are sorted by
    #[allow(clippy::cast_possible_wrap)]
    pub const fn sort_key(&self) -> i32 {
        self.hash as i32
    }
}
