//! Mix header layout and format detection
//!
//! Three header layouts exist:
//!
//! ```text
//! Legacy:     [u16 count][u32 size][count x entry][data]
//! Extended:   [u32 flags][u16 count][u32 size][count x entry][data]
//! Encrypted:  [u32 flags][80-byte key source][Blowfish(count, size, entries)][data]
//! ```
//!
//! A stream is extended when its first little-endian word has no bits set
//! outside the known flags. Legacy archives almost never satisfy that since
//! the low half of the word is a non-zero entry count.

use binrw::{BinRead, BinWrite};

/// Archive carries a trailing digest (not verified)
pub const FLAG_CHECKSUM: u32 = 0x0001_0000;

/// Entry table is Blowfish encrypted
pub const FLAG_ENCRYPTED: u32 = 0x0002_0000;

/// Size of the flag word
pub const FLAGS_SIZE: usize = 4;

/// Size of the count/size header
pub const HEADER_SIZE: usize = 6;

/// Flag word plus key source
pub const ENCRYPTED_PREAMBLE_SIZE: usize = FLAGS_SIZE + mixfs_crypto::WRAPPED_KEY_SIZE;

/// Header layout of an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MixHeaderFormat {
    /// No flag word
    #[default]
    Legacy,
    /// Flag word, plaintext table
    Extended,
    /// Flag word, encrypted table
    Encrypted,
}

impl MixHeaderFormat {
    /// Detect the layout from the leading little-endian word
    pub const fn detect(first_word: u32) -> Self {
        if first_word & !(FLAG_CHECKSUM | FLAG_ENCRYPTED) != 0 {
            Self::Legacy
        } else if first_word & FLAG_ENCRYPTED != 0 {
            Self::Encrypted
        } else {
            Self::Extended
        }
    }

    /// True for layouts that start with a flag word
    pub const fn has_flags(self) -> bool {
        !matches!(self, Self::Legacy)
    }
}

impl std::fmt::Display for MixHeaderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Extended => write!(f, "extended"),
            Self::Encrypted => write!(f, "encrypted"),
        }
    }
}

/// Entry count and data size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct MixHeader {
    /// Declared number of entries
    pub file_count: u16,
    /// Declared size of the data region
    pub data_size: u32,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_format() {
        assert_eq!(MixHeaderFormat::detect(0), MixHeaderFormat::Extended);
        assert_eq!(
            MixHeaderFormat::detect(FLAG_CHECKSUM),
            MixHeaderFormat::Extended
        );
        assert_eq!(
            MixHeaderFormat::detect(FLAG_ENCRYPTED),
            MixHeaderFormat::Encrypted
        );
        assert_eq!(
            MixHeaderFormat::detect(FLAG_ENCRYPTED | FLAG_CHECKSUM),
            MixHeaderFormat::Encrypted
        );
        // count = 3, low half of size = 0x0010
        assert_eq!(
            MixHeaderFormat::detect(0x0010_0003),
            MixHeaderFormat::Legacy
        );
        assert_eq!(
            MixHeaderFormat::detect(0x0004_0000),
            MixHeaderFormat::Legacy
        );
    }

    #[test]
    fn test_header_layout() {
        let header = MixHeader::read_le(&mut Cursor::new([0x02, 0x00, 0x10, 0x00, 0x00, 0x00]))
            .unwrap();
        assert_eq!(
            header,
            MixHeader {
                file_count: 2,
                data_size: 16
            }
        );

        let mut out = Cursor::new(Vec::new());
        header.write_le(&mut out).unwrap();
        assert_eq!(out.into_inner().len(), HEADER_SIZE);
    }
}
