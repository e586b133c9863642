//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrapped key blob has the wrong size
    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize {
        /// Expected key size in bytes
        expected: usize,
        /// Actual key size in bytes
        actual: usize,
    },

    /// Blowfish key outside the supported range
    #[error("Invalid key length: {0} (must be 4-56 bytes)")]
    InvalidKeyLength(usize),

    /// Buffer is not a whole number of cipher blocks
    #[error("Invalid block length: {length} is not a multiple of {block_size}")]
    InvalidBlockLength {
        /// Buffer length in bytes
        length: usize,
        /// Cipher block size in bytes
        block_size: usize,
    },

    /// Invalid key format
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidKeyFormat(format!("Base64 decode failed: {err}"))
    }
}
