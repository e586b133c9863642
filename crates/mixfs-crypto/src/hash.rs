//! Filename hashing for mix archive indices
//!
//! Mix archives never store filenames. Each entry is keyed by a CRC32 over
//! the uppercased name, padded to a whole number of 4-byte groups:
//!
//! 1. uppercase the name
//! 2. if the length is not a multiple of 4, append one byte holding the
//!    remainder count (`len % 4`)
//! 3. keep appending the byte found at the start of the last partial group
//!    until the length is a multiple of 4
//! 4. CRC32 (IEEE) over the resulting bytes
//!
//! The result has to match the tooling that produced existing archives bit
//! for bit, so names are treated as raw 8-bit buffers, one byte per
//! character code.

/// Hash a filename the way mix archive indices key it.
///
/// Lookups are case-insensitive because the name is uppercased first.
///
/// # Examples
///
/// ```
/// use mixfs_crypto::hash::hash_name;
///
/// assert_eq!(hash_name("rules.ini"), hash_name("RULES.INI"));
/// assert_eq!(hash_name("local mix database.dat"), 0x366E_051F);
/// ```
pub fn hash_name(name: &str) -> u32 {
    let buf: Vec<u8> = name
        .chars()
        .flat_map(char::to_uppercase)
        .map(|c| c as u32 as u8)
        .collect();
    hash_padded(buf)
}

/// Hash a name that is already a raw 8-bit buffer.
///
/// Only ASCII letters are uppercased; other bytes pass through unchanged.
pub fn hash_name_bytes(name: &[u8]) -> u32 {
    hash_padded(name.to_ascii_uppercase())
}

fn hash_padded(mut buf: Vec<u8>) -> u32 {
    let len = buf.len();
    let remainder = len % 4;

    if remainder != 0 {
        let group_start = len - remainder;
        buf.push(remainder as u8);

        let fill = buf[group_start];
        while buf.len() % 4 != 0 {
            buf.push(fill);
        }
    }

    crc32fast::hash(&buf)
}
