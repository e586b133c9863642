//! Public-key unwrap of the Blowfish key stored in encrypted mix headers
//!
//! Encrypted archives carry an 80-byte "key source" right after the flag
//! word. It is the Blowfish key transformed with a private key; the game
//! recovers it with the matching public key, which ships embedded as a
//! base64 DER integer.
//!
//! The unwrap works on little-endian blocks one byte wider than the
//! modulus allows for output:
//!
//! ```text
//! for each 40-byte block m of the key source:
//!     c = m ^ 65537 mod n
//!     emit the low 39 bytes of c (little-endian)
//! key = first 56 emitted bytes
//! ```

use crate::error::CryptoError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::BigUint;
use std::sync::OnceLock;

/// Embedded public key (DER INTEGER holding the modulus)
const WESTWOOD_PUBLIC_KEY: &str = "AihRvNoIbTn85FZRYNZRcT+i6KpU+maCsEqr3Q5q+LDB5tH7Tz2qQ38V";

/// Public exponent used with the embedded modulus
const PUBLIC_EXPONENT: u32 = 0x10001;

/// Size of the recovered Blowfish key
pub const BLOWFISH_KEY_SIZE: usize = 56;

/// Size of the wrapped key blob in an encrypted header
pub const WRAPPED_KEY_SIZE: usize = 80;

/// DER tag for INTEGER
const DER_INTEGER: u8 = 0x02;

/// Public key used to unwrap header keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    modulus: BigUint,
    exponent: BigUint,
    bits: usize,
}

impl PublicKey {
    /// The public key embedded in every game client
    pub fn westwood() -> Result<&'static Self, CryptoError> {
        static KEY: OnceLock<Option<PublicKey>> = OnceLock::new();
        KEY.get_or_init(|| Self::from_der_base64(WESTWOOD_PUBLIC_KEY, PUBLIC_EXPONENT).ok())
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKeyFormat("embedded public key".to_string()))
    }

    /// Parse a base64 DER INTEGER modulus
    pub fn from_der_base64(encoded: &str, exponent: u32) -> Result<Self, CryptoError> {
        let der = STANDARD.decode(encoded)?;
        let modulus = parse_der_integer(&der)?;
        let bits = usize::try_from(modulus.bits())
            .map_err(|_| CryptoError::InvalidKeyFormat("modulus too large".to_string()))?;

        if bits < 16 {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "modulus too small: {bits} bits"
            )));
        }

        Ok(Self {
            modulus,
            exponent: BigUint::from(exponent),
            bits,
        })
    }

    /// Bit length of the modulus
    pub const fn bits(&self) -> usize {
        self.bits
    }

    /// Bytes produced per unwrapped block
    pub const fn output_block_len(&self) -> usize {
        (self.bits - 2) / 8
    }

    /// Bytes consumed per wrapped block
    pub const fn input_block_len(&self) -> usize {
        self.output_block_len() + 1
    }

    /// Size of a wrapped blob carrying a full Blowfish key
    pub const fn wrapped_key_len(&self) -> usize {
        ((BLOWFISH_KEY_SIZE - 1) / self.output_block_len() + 1) * self.input_block_len()
    }

    /// Recover the Blowfish key from a wrapped key blob
    pub fn unwrap_key(&self, blob: &[u8]) -> Result<[u8; BLOWFISH_KEY_SIZE], CryptoError> {
        let expected = self.wrapped_key_len();
        if blob.len() != expected {
            return Err(CryptoError::InvalidKeySize {
                expected,
                actual: blob.len(),
            });
        }

        let out_len = self.output_block_len();
        let mut unwrapped = Vec::with_capacity(expected);
        for block in blob.chunks_exact(self.input_block_len()) {
            let value = BigUint::from_bytes_le(block).modpow(&self.exponent, &self.modulus);
            let mut bytes = value.to_bytes_le();
            bytes.resize(out_len, 0);
            unwrapped.extend_from_slice(&bytes);
        }

        let mut key = [0u8; BLOWFISH_KEY_SIZE];
        key.copy_from_slice(&unwrapped[..BLOWFISH_KEY_SIZE]);
        Ok(key)
    }
}

fn parse_der_integer(der: &[u8]) -> Result<BigUint, CryptoError> {
    let (&tag, rest) = der
        .split_first()
        .ok_or_else(|| CryptoError::InvalidKeyFormat("empty key".to_string()))?;
    if tag != DER_INTEGER {
        return Err(CryptoError::InvalidKeyFormat(format!(
            "expected INTEGER tag, got {tag:#04x}"
        )));
    }

    let (&first, rest) = rest
        .split_first()
        .ok_or_else(|| CryptoError::InvalidKeyFormat("missing length".to_string()))?;

    // Short form length, or long form with the low bits giving the byte count
    let (len, body) = if first & 0x80 == 0 {
        (usize::from(first), rest)
    } else {
        let count = usize::from(first & 0x7F);
        if count == 0 || count > 4 || rest.len() < count {
            return Err(CryptoError::InvalidKeyFormat(
                "invalid length encoding".to_string(),
            ));
        }
        let len = rest[..count]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        (len, &rest[count..])
    };

    if body.len() < len {
        return Err(CryptoError::InvalidKeyFormat(format!(
            "INTEGER declares {len} bytes, {} available",
            body.len()
        )));
    }

    Ok(BigUint::from_bytes_be(&body[..len]))
}

/// Recover the Blowfish key using the embedded public key
pub fn unwrap_key(blob: &[u8]) -> Result<[u8; BLOWFISH_KEY_SIZE], CryptoError> {
    PublicKey::westwood()?.unwrap_key(blob)
}
