//! Subcommand handlers.
//!
//! Handlers write to a caller-provided sink so they can be driven from tests
//! without capturing standard output.

use crate::cli::{Cli, Commands, NamespaceArgs};
use anyhow::{Context, Result};
use mixfs_crypto::hash_name;
use mixfs_formats::{MixArchive, MixParseOptions, VirtualFile};
use mixfs_storage::VirtualFileSystem;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Hash { names } => hash_names(&names, &mut out)?,
        Commands::List {
            archive,
            names,
            strict,
        } => list_archive(&archive, names.as_deref(), strict, &mut out)?,
        Commands::Extract {
            archive,
            name,
            output,
        } => {
            let file = extract(&archive, &name)?;
            write_output(&file, output.as_deref(), &mut out)?;
        }
        Commands::Cat {
            namespace,
            name,
            output,
        } => {
            let file = cat(&namespace, &name).await?;
            write_output(&file, output.as_deref(), &mut out)?;
        }
    }

    Ok(())
}

/// Print `XXXXXXXX  NAME` for each name.
pub fn hash_names<W: Write>(names: &[String], out: &mut W) -> Result<()> {
    for name in names {
        writeln!(out, "{:08X}  {}", hash_name(name), name)?;
    }
    Ok(())
}

/// Print an archive's header summary followed by its entry table.
///
/// Entries whose hash matches a line of `names_file` are labelled with that
/// name.
pub fn list_archive<W: Write>(
    path: &Path,
    names_file: Option<&Path>,
    strict: bool,
    out: &mut W,
) -> Result<()> {
    let archive = open_archive(path, strict)?;

    let names = match names_file {
        Some(names_file) => {
            let text = std::fs::read_to_string(names_file)
                .with_context(|| format!("failed to read {}", names_file.display()))?;
            archive.identify(text.lines().map(str::trim).filter(|l| !l.is_empty()))
        }
        None => Default::default(),
    };
    debug!("Identified {} of {} entries", names.len(), archive.len());

    writeln!(out, "archive:    {}", path.display())?;
    writeln!(out, "format:     {}", archive.header_format())?;
    writeln!(out, "flags:      {:#010x}", archive.flags())?;
    writeln!(
        out,
        "entries:    {} of {} declared{}",
        archive.len(),
        archive.declared_count(),
        if archive.is_truncated() {
            " (truncated table)"
        } else {
            ""
        }
    )?;
    writeln!(out, "data start: {}", archive.data_start())?;
    writeln!(
        out,
        "data size:  {} ({} declared)",
        archive.data_size(),
        archive.declared_data_size()
    )?;
    writeln!(out)?;
    writeln!(out, "{:<8}  {:>10}  {:>10}  NAME", "HASH", "OFFSET", "LENGTH")?;

    for entry in archive.entries() {
        let name = names.get(&entry.hash).map_or("?", String::as_str);
        writeln!(
            out,
            "{:08X}  {:>10}  {:>10}  {}",
            entry.hash, entry.offset, entry.length, name
        )?;
    }

    Ok(())
}

/// Read one file out of an archive on disk.
pub fn extract(path: &Path, name: &str) -> Result<VirtualFile> {
    let archive = open_archive(path, false)?;
    let file = archive
        .open_file(name)
        .with_context(|| format!("{name} is not readable from {}", path.display()))?;
    info!("Extracted {} ({} bytes)", name, file.size());
    Ok(file)
}

/// Resolve a name through the namespace described by `args`.
pub async fn cat(args: &NamespaceArgs, name: &str) -> Result<VirtualFile> {
    let config = args.to_config().context("invalid namespace configuration")?;
    let vfs = VirtualFileSystem::from_config(&config)
        .await
        .context("failed to build namespace")?;
    let file = vfs.open_file(name).await?;
    info!("Resolved {} ({} bytes)", name, file.size());
    Ok(file)
}

/// Write a file's bytes to `output`, or to `out` when no path is given.
pub fn write_output<W: Write>(file: &VirtualFile, output: Option<&Path>, out: &mut W) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, file.as_slice())
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            out.write_all(file.as_slice())?;
            out.flush()?;
        }
    }
    Ok(())
}

fn open_archive(path: &Path, strict: bool) -> Result<MixArchive> {
    let options = if strict {
        MixParseOptions::strict()
    } else {
        MixParseOptions::default()
    };
    MixArchive::open_with_options(path, options)
        .with_context(|| format!("failed to open archive {}", path.display()))
}
