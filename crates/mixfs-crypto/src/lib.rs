//! Cryptographic operations for Westwood mix archives
//!
//! This crate provides the primitives the mix container format relies on:
//!
//! # Components
//!
//! - **Hashing**: CRC32-based filename hashes, the only key space inside an archive
//! - **Encryption**: Blowfish (ECB) protecting encrypted entry tables
//! - **Key Unwrap**: recovery of the Blowfish key from the 80-byte key source
//!   using the public key embedded in the game clients
//!
//! # Examples
//!
//! ## Filename Hashing
//!
//! ```
//! use mixfs_crypto::hash_name;
//!
//! let hash = hash_name("rules.ini");
//! println!("rules.ini: {hash:08X}");
//! ```
//!
//! ## Decrypting a Header Block
//!
//! ```
//! use mixfs_crypto::{BlowfishCipher, unwrap_key};
//!
//! let key_source = [0x5Au8; 80];
//! let key = unwrap_key(&key_source)?;
//! let cipher = BlowfishCipher::new(&key)?;
//!
//! let mut block = [0u8; 8];
//! cipher.decrypt_blocks(&mut block)?;
//! # Ok::<(), mixfs_crypto::CryptoError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod hash;
pub mod header_cipher;
pub mod key;

pub use error::CryptoError;

// Re-export commonly used types
pub use hash::{hash_name, hash_name_bytes};
pub use header_cipher::{BLOCK_SIZE, BlowfishCipher, round_up_to_block};
pub use key::{BLOWFISH_KEY_SIZE, PublicKey, WRAPPED_KEY_SIZE, unwrap_key};
