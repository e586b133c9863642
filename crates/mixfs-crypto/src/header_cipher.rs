//! Blowfish block cipher protecting encrypted mix headers
//!
//! Encrypted archives run their entry table through plain Blowfish in ECB
//! mode with the standard big-endian word order. The key is the 56-byte
//! output of [`crate::key::unwrap_key`].

use crate::error::CryptoError;
use ::blowfish::Blowfish;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use std::fmt;

/// Blowfish block size in bytes
pub const BLOCK_SIZE: usize = 8;

/// Blowfish cipher in ECB mode
pub struct BlowfishCipher {
    inner: Blowfish,
}

impl BlowfishCipher {
    /// Create a cipher from a 4-56 byte key
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = <Blowfish as KeyInit>::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self { inner })
    }

    /// Decrypt `data` in place, block by block
    pub fn decrypt_blocks(&self, data: &mut [u8]) -> Result<(), CryptoError> {
        check_block_length(data.len())?;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    /// Encrypt `data` in place, block by block
    pub fn encrypt_blocks(&self, data: &mut [u8]) -> Result<(), CryptoError> {
        check_block_length(data.len())?;
        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            self.inner.encrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}

impl fmt::Debug for BlowfishCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlowfishCipher").finish_non_exhaustive()
    }
}

fn check_block_length(length: usize) -> Result<(), CryptoError> {
    if length % BLOCK_SIZE == 0 {
        Ok(())
    } else {
        Err(CryptoError::InvalidBlockLength {
            length,
            block_size: BLOCK_SIZE,
        })
    }
}

/// Round `len` up to the next whole cipher block
pub const fn round_up_to_block(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}
