//! Directory capability backends

pub mod fs;
pub mod memory;

pub use fs::FsDirectory;
pub use memory::MemoryDirectory;
