//! Command-line definitions.
//!
//! Every option that names a path or archive can also be set through a
//! `MIXFS_*` environment variable. List-valued variables are comma separated.

use clap::{Parser, Subcommand};
use mixfs_formats::TablePolicy;
use mixfs_storage::VfsConfig;
use std::path::PathBuf;

/// Top-level arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mixfs",
    about = "Inspect mix archives and resolve names through a layered game filesystem",
    version
)]
pub struct Cli {
    /// Raise the default log level to debug
    #[arg(short, long, global = true, env = "MIXFS_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Print the archive hash of each name
    Hash {
        /// Names to hash
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print an archive's header summary and entry table
    List {
        /// Archive file on disk
        archive: PathBuf,

        /// Newline-separated list of candidate names
        #[arg(long, env = "MIXFS_NAMES")]
        names: Option<PathBuf>,

        /// Fail on truncated entry tables instead of reading the prefix
        #[arg(long)]
        strict: bool,
    },

    /// Copy one file out of an archive
    Extract {
        /// Archive file on disk
        archive: PathBuf,

        /// Name of the file inside the archive
        name: String,

        /// Output path (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a name through a configured namespace
    Cat {
        #[command(flatten)]
        namespace: NamespaceArgs,

        /// Name to resolve
        name: String,

        /// Output path (standard output when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options describing a namespace.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct NamespaceArgs {
    /// JSON configuration file
    #[arg(long, env = "MIXFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Game directory (overrides the configuration file)
    #[arg(long, env = "MIXFS_ROOT")]
    pub root: Option<PathBuf>,

    /// Extra search-only directory, searched after the root
    #[arg(long = "overlay", env = "MIXFS_OVERLAYS", value_delimiter = ',')]
    pub overlays: Vec<PathBuf>,

    /// Archive to load, base first
    #[arg(long = "archive", env = "MIXFS_ARCHIVES", value_delimiter = ',')]
    pub archives: Vec<String>,

    /// Fail on truncated entry tables instead of reading the prefix
    #[arg(long)]
    pub strict: bool,
}

impl NamespaceArgs {
    /// Merge command-line values over the configuration file.
    ///
    /// Overlays and archives given on the command line are appended to the
    /// ones from the file.
    pub fn to_config(&self) -> mixfs_storage::Result<VfsConfig> {
        let mut config = match &self.config {
            Some(path) => VfsConfig::from_json_file(path)?,
            None => VfsConfig::default(),
        };

        if let Some(root) = &self.root {
            config = config.with_root(root);
        }
        for overlay in &self.overlays {
            config = config.with_overlay(overlay);
        }
        for archive in &self.archives {
            config = config.with_archive(archive.clone());
        }
        if self.strict {
            config = config.with_table_policy(TablePolicy::Strict);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cat() {
        let cli = Cli::try_parse_from([
            "mixfs", "cat", "--root", "/games/ra2", "--archive", "ra2.mix", "--archive",
            "local.mix", "--overlay", "/mods/a", "rules.ini",
        ])
        .unwrap();

        let Commands::Cat {
            namespace, name, ..
        } = cli.command
        else {
            unreachable!("parsed another subcommand");
        };
        assert_eq!(name, "rules.ini");

        let config = namespace.to_config().unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/games/ra2")));
        assert_eq!(config.archives, vec!["ra2.mix", "local.mix"]);
        assert_eq!(config.overlays, vec![PathBuf::from("/mods/a")]);
        assert_eq!(config.table_policy, TablePolicy::Lenient);
    }

    #[test]
    fn test_config_file_merged_with_arguments() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{"root": "/games/ts", "archives": ["tibsun.mix"], "case_sensitive": true}"#,
        )
        .unwrap();

        let args = NamespaceArgs {
            config: Some(file.path().to_path_buf()),
            archives: vec!["patch.mix".to_string()],
            strict: true,
            ..Default::default()
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.root, Some(PathBuf::from("/games/ts")));
        assert_eq!(config.archives, vec!["tibsun.mix", "patch.mix"]);
        assert!(config.case_sensitive);
        assert_eq!(config.table_policy, TablePolicy::Strict);
    }

    #[test]
    fn test_overlay_without_root_rejected() {
        let args = NamespaceArgs {
            overlays: vec![PathBuf::from("/mods/a")],
            ..Default::default()
        };
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_hash_requires_names() {
        assert!(Cli::try_parse_from(["mixfs", "hash"]).is_err());
    }
}
