//! Command-line interface for aggcache.
//!
//! # Available Commands
//!
//! - `build` - Build the aggregate cache for a graph manifest and print
//!   statistics; in live mode, reuse and refresh the persisted live state
//! - `closure` - Register a set of packages and print its aggregate identity
//!   and closure
//!
//! # Command Usage Patterns
//!
//! ```bash
//! # One-off build
//! aggcache build --graph packages.toml
//!
//! # Live development loop: every run reuses the stable table of the previous one
//! aggcache build --graph packages.toml --live
//!
//! # Inspect a package set
//! aggcache closure --graph packages.toml themes p3 --format json
//! ```
//!
//! # Logging
//!
//! `RUST_LOG` takes precedence; otherwise `--verbose` selects `debug`,
//! `--quiet` disables logging and the default is `info`.

mod build;
mod closure;

pub use build::BuildCommand;
pub use closure::ClosureCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::AggConfig;
use crate::graph::PackageGraph;
use crate::graph::manifest::GraphManifest;

/// Runtime configuration for CLI execution, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    ///
    /// `None` disables logging.
    pub log_level: Option<String>,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a new CLI configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Output format of the inspection commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output with colors.
    #[default]
    Text,

    /// Structured JSON output for automation.
    Json,
}

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    name = "aggcache",
    about = "Package reachability and aggregate cache",
    version,
    long_about = "aggcache builds reachability closures and aggregate identities for a package graph, \
                  and persists the stable part for incremental live rebuilds."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to `RUST_LOG=debug`).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file, instead of `aggcache.toml` next to the graph.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the aggregate cache and print statistics.
    Build(BuildCommand),

    /// Print the aggregate identity and closure of a package set.
    Closure(ClosureCommand),
}

impl Cli {
    /// Execute the selected command.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    /// Derive the runtime configuration from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration, for tests and embedding.
    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Build(cmd) => cmd.execute(&config, self.quiet),
            Commands::Closure(cmd) => cmd.execute(),
        }
    }
}

/// Load and validate the graph manifest at `path`.
fn load_graph(path: &Path) -> Result<PackageGraph> {
    let manifest = GraphManifest::load(path)?;
    let graph = manifest.to_graph()?;
    tracing::debug!("Loaded {} packages from {}", graph.len() - 2, path.display());
    Ok(graph)
}

/// Configuration for the graph at `path`.
fn load_config(path: &Path, config: &CliConfig) -> Result<AggConfig> {
    AggConfig::load_for_manifest(path, config.config_path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_selects_debug() {
        let cli = Cli::parse_from(["aggcache", "--verbose", "build", "--graph", "g.toml"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_quiet_disables_logging() {
        let cli = Cli::parse_from(["aggcache", "build", "--graph", "g.toml", "-q"]);
        assert_eq!(cli.build_config().log_level, None);
    }

    #[test]
    fn test_default_is_info_and_config_passes_through() {
        let cli = Cli::parse_from(["aggcache", "--config", "c.toml", "closure", "--graph", "g.toml", "p1"]);
        let config = cli.build_config();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.config_path, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["aggcache", "-v", "-q", "build", "--graph", "g.toml"]).is_err());
    }

    #[test]
    fn test_closure_requires_packages() {
        assert!(Cli::try_parse_from(["aggcache", "closure", "--graph", "g.toml"]).is_err());
    }
}
