//! Archive formats and file views for Westwood game assets
//!
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::doc_markdown)] // Format names don't need backticks
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate parses and builds the "mix" container used by the classic
//! strategy games, and provides [`VirtualFile`], the named zero-copy view
//! that every lookup returns.
//!
//! # Supported Formats
//!
//! - **Legacy mix**: count/size header followed by the entry table
//! - **Extended mix**: flag word, then the legacy layout
//! - **Encrypted mix**: flag word, wrapped Blowfish key, encrypted entry table
//!
//! # Example
//!
//! ```rust,no_run
//! use mixfs_formats::mix::MixArchive;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = MixArchive::open("ra2.mix")?;
//! let local = MixArchive::from_view(&archive.open_file("local.mix")?)?;
//! let rules = local.open_file("rules.ini")?;
//! println!("{} bytes", rules.size());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod mix;
pub mod virtual_file;

pub use mix::{MixArchive, MixBuilder, MixEntry, MixError, MixParseOptions, MixResult, TablePolicy};
pub use virtual_file::{Blob, SourceRange, TextEncoding, ViewError, VirtualFile};
