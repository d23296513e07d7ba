//! `aggcache build`: build the cache, optionally through the live state.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{CliConfig, OutputFormat, load_config, load_graph};
use crate::cache::{CacheBuilder, CacheStats};
use crate::live::{LiveStateFile, load_live_state};

/// Build the aggregate cache for a graph manifest.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Graph manifest listing the packages.
    #[arg(long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Reuse and refresh the persisted live state.
    ///
    /// Also enabled by `[live] enabled = true` or `AGGCACHE_LIVE=1`.
    #[arg(long)]
    pub live: bool,

    /// Live-state file, overriding the configured path.
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Output format: text or json.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Result of a build, as printed.
#[derive(Debug, Serialize)]
struct BuildReport {
    fingerprint: String,
    live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_path: Option<PathBuf>,
    reused_state: bool,
    stats: CacheStats,
}

impl BuildCommand {
    /// Run the build.
    pub fn execute(self, config: &CliConfig, quiet: bool) -> Result<()> {
        let graph = load_graph(&self.graph)?;
        let settings = load_config(&self.graph, config)?;

        let live = self.live || settings.live.enabled;
        let state_path = live.then(|| self.state.clone().unwrap_or_else(|| settings.resolve_state_path(&self.graph)));

        let mut builder = CacheBuilder::new().live(live);
        if let Some(path) = &state_path
            && let Some(state) = load_live_state(path, &graph)
        {
            builder = builder.with_live_state(state);
        }

        let fingerprint = graph.fingerprint();
        let cache = builder.build(graph);
        let stats = cache.stats();

        if let Some(path) = &state_path {
            LiveStateFile::new(cache.graph(), &cache.live_state())?.save(path)?;
        }

        let report = BuildReport {
            fingerprint,
            live,
            state_path,
            reused_state: stats.seeded_stable_aggregates > 0,
            stats,
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text if !quiet => print_report(&report),
            OutputFormat::Text => {}
        }
        Ok(())
    }
}

fn print_report(report: &BuildReport) {
    let stats = &report.stats;
    println!(
        "{} Built aggregate cache for {} packages ({} local-dependent)",
        "✓".green(),
        stats.packages,
        stats.local_dependent_packages
    );
    println!("  {} {}", "graph:".dimmed(), report.fingerprint);
    println!(
        "  {} {} stable, {} local-dependent, {} synthesized",
        "reachable sets:".dimmed(),
        stats.stable_sets,
        stats.local_sets,
        stats.synthesized_sets
    );
    println!(
        "  {} {} stable, {} local",
        "aggregates:".dimmed(),
        stats.stable_aggregates,
        stats.local_aggregates
    );

    if let Some(path) = &report.state_path {
        if report.reused_state {
            println!(
                "  {} reused {} stable aggregates",
                "live:".dimmed(),
                stats.seeded_stable_aggregates.to_string().cyan()
            );
        } else {
            println!("  {} {}", "live:".dimmed(), "full rebuild".yellow());
        }
        println!(
            "  {} {} stable identifiers written to {}",
            "live:".dimmed(),
            stats.stable_identifiers,
            path.display()
        );
    }
}
