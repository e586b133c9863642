//! Command-line front end for mix archives and layered game filesystems.
//!
//! The `mixfs` binary is a thin wrapper around [`run`]. The handlers in
//! [`commands`] are public so they can be reused and tested directly.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, NamespaceArgs};
pub use commands::run;
