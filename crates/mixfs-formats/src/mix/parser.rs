//! Entry table parsing
//!
//! Turns the leading bytes of an archive stream into its entry table and the
//! absolute offset of the data region. File contents are never touched here.

use super::entry::{ENTRY_SIZE, MixEntry};
use super::error::{MixError, MixResult};
use super::header::{
    ENCRYPTED_PREAMBLE_SIZE, FLAGS_SIZE, HEADER_SIZE, MixHeader, MixHeaderFormat,
};
use binrw::BinRead;
use mixfs_crypto::{BLOCK_SIZE, BlowfishCipher, round_up_to_block, unwrap_key};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::warn;

/// How to treat an entry table that runs past the end of the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TablePolicy {
    /// Keep the complete records that were readable and mark the archive truncated
    #[default]
    Lenient,
    /// Fail with [`MixError::TruncatedTable`]
    Strict,
}

/// Options for archive parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixParseOptions {
    /// Truncated table handling
    #[serde(default)]
    pub table_policy: TablePolicy,
}

impl MixParseOptions {
    /// Options that reject truncated tables
    pub const fn strict() -> Self {
        Self {
            table_policy: TablePolicy::Strict,
        }
    }

    /// Set the truncated table policy
    #[must_use]
    pub const fn with_table_policy(mut self, table_policy: TablePolicy) -> Self {
        self.table_policy = table_policy;
        self
    }
}

/// Parsed header and entry table
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedTable {
    pub format: MixHeaderFormat,
    pub flags: u32,
    pub header: MixHeader,
    /// Records in table order
    pub entries: Vec<MixEntry>,
    pub data_start: usize,
    pub truncated: bool,
}

/// Parse the header and entry table at the start of `data`
pub(crate) fn parse_table(data: &[u8], options: MixParseOptions) -> MixResult<ParsedTable> {
    let word = data
        .get(..FLAGS_SIZE)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(MixError::TruncatedHeader {
            needed: FLAGS_SIZE,
            available: data.len(),
        })?;

    match MixHeaderFormat::detect(word) {
        MixHeaderFormat::Legacy => parse_plain(data, MixHeaderFormat::Legacy, 0, options),
        MixHeaderFormat::Extended => parse_plain(data, MixHeaderFormat::Extended, word, options),
        MixHeaderFormat::Encrypted => parse_encrypted(data, word, options),
    }
}

fn parse_plain(
    data: &[u8],
    format: MixHeaderFormat,
    flags: u32,
    options: MixParseOptions,
) -> MixResult<ParsedTable> {
    let start = if format.has_flags() { FLAGS_SIZE } else { 0 };
    let table_start = start + HEADER_SIZE;
    if data.len() < table_start {
        return Err(MixError::TruncatedHeader {
            needed: table_start,
            available: data.len(),
        });
    }

    let header = MixHeader::read_le(&mut Cursor::new(&data[start..table_start]))?;
    let (entries, truncated) = read_entries(&data[table_start..], header.file_count, options)?;
    let data_start = table_start + entries.len() * ENTRY_SIZE;

    Ok(ParsedTable {
        format,
        flags,
        header,
        entries,
        data_start,
        truncated,
    })
}

fn parse_encrypted(data: &[u8], flags: u32, options: MixParseOptions) -> MixResult<ParsedTable> {
    let first_block_end = ENCRYPTED_PREAMBLE_SIZE + BLOCK_SIZE;
    if data.len() < first_block_end {
        return Err(MixError::TruncatedHeader {
            needed: first_block_end,
            available: data.len(),
        });
    }

    let key = unwrap_key(&data[FLAGS_SIZE..ENCRYPTED_PREAMBLE_SIZE])?;
    let cipher = BlowfishCipher::new(&key)?;

    let mut first = [0u8; BLOCK_SIZE];
    first.copy_from_slice(&data[ENCRYPTED_PREAMBLE_SIZE..first_block_end]);
    cipher.decrypt_blocks(&mut first)?;
    let header = MixHeader::read_le(&mut Cursor::new(&first[..HEADER_SIZE]))?;

    // The first block already carries the first two table bytes
    let table_size = usize::from(header.file_count) * ENTRY_SIZE;
    let carried = BLOCK_SIZE - HEADER_SIZE;
    let wanted = round_up_to_block(table_size.saturating_sub(carried));
    let body = &data[first_block_end..];
    let available = wanted.min(body.len() - body.len() % BLOCK_SIZE);

    let mut table = Vec::with_capacity(carried + available);
    table.extend_from_slice(&first[HEADER_SIZE..]);
    let mut rest = body[..available].to_vec();
    cipher.decrypt_blocks(&mut rest)?;
    table.extend_from_slice(&rest);
    table.truncate(table_size);

    let (entries, truncated) = read_entries(&table, header.file_count, options)?;
    let data_start = ENCRYPTED_PREAMBLE_SIZE + round_up_to_block(HEADER_SIZE + table_size);

    Ok(ParsedTable {
        format: MixHeaderFormat::Encrypted,
        flags,
        header,
        entries,
        data_start,
        truncated,
    })
}

fn read_entries(
    table: &[u8],
    declared: u16,
    options: MixParseOptions,
) -> MixResult<(Vec<MixEntry>, bool)> {
    let count = usize::from(declared);
    let readable = table.len() / ENTRY_SIZE;

    let truncated = readable < count;
    if truncated {
        match options.table_policy {
            TablePolicy::Strict => {
                return Err(MixError::TruncatedTable { declared, readable });
            }
            TablePolicy::Lenient => {
                warn!(
                    "Entry table truncated: {} entries declared, keeping {}",
                    declared, readable
                );
            }
        }
    }

    let take = count.min(readable);
    let mut cursor = Cursor::new(table);
    let mut entries = Vec::with_capacity(take);
    for _ in 0..take {
        entries.push(MixEntry::read_le(&mut cursor)?);
    }

    Ok((entries, truncated))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn legacy_table(entries: &[MixEntry], declared: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&declared.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        for entry in entries {
            data.extend_from_slice(&entry.hash.to_le_bytes());
            data.extend_from_slice(&entry.offset.to_le_bytes());
            data.extend_from_slice(&entry.length.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_legacy_data_start() {
        let entries = [MixEntry::new(1, 0, 4), MixEntry::new(2, 4, 4)];
        let data = legacy_table(&entries, 2);
        let parsed = parse_table(&data, MixParseOptions::default()).unwrap();

        assert_eq!(parsed.format, MixHeaderFormat::Legacy);
        assert_eq!(parsed.flags, 0);
        assert_eq!(parsed.entries, entries);
        assert_eq!(parsed.data_start, 6 + 24);
        assert!(!parsed.truncated);
    }

    #[test]
    fn test_extended_data_start() {
        let entries = [MixEntry::new(7, 0, 1)];
        let mut data = 0x0001_0000u32.to_le_bytes().to_vec();
        data.extend(legacy_table(&entries, 1));
        let parsed = parse_table(&data, MixParseOptions::default()).unwrap();

        assert_eq!(parsed.format, MixHeaderFormat::Extended);
        assert_eq!(parsed.flags, 0x0001_0000);
        assert_eq!(parsed.data_start, 4 + 6 + 12);
    }

    #[test]
    fn test_short_streams() {
        assert!(matches!(
            parse_table(&[1, 0], MixParseOptions::default()),
            Err(MixError::TruncatedHeader {
                needed: 4,
                available: 2
            })
        ));
        // Extended flag word with no room for the count header
        assert!(matches!(
            parse_table(&[0, 0, 0, 0, 1], MixParseOptions::default()),
            Err(MixError::TruncatedHeader { needed: 10, .. })
        ));
        // Encrypted flag word with a partial key source
        assert!(matches!(
            parse_table(&[0, 0, 2, 0, 9, 9], MixParseOptions::default()),
            Err(MixError::TruncatedHeader { needed: 92, .. })
        ));
    }

    #[test]
    fn test_truncation_policy() {
        let entries = [MixEntry::new(1, 0, 4), MixEntry::new(2, 4, 4)];
        let mut data = legacy_table(&entries, 3);
        // Half of a third record
        data.extend_from_slice(&[0xAA; 6]);

        let lenient = parse_table(&data, MixParseOptions::default()).unwrap();
        assert!(lenient.truncated);
        assert_eq!(lenient.header.file_count, 3);
        assert_eq!(lenient.entries, entries);
        assert_eq!(lenient.data_start, 6 + 24);

        let strict = parse_table(&data, MixParseOptions::strict());
        assert!(matches!(
            strict,
            Err(MixError::TruncatedTable {
                declared: 3,
                readable: 2
            })
        ));
    }

    #[test]
    fn test_policy_serde_names() {
        let options: MixParseOptions =
            serde_json::from_str(r#"{"table_policy":"strict"}"#).unwrap();
        assert_eq!(options.table_policy, TablePolicy::Strict);
        let options: MixParseOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.table_policy, TablePolicy::Lenient);
    }
}
