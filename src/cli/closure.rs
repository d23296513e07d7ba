//! `aggcache closure`: aggregate identity and closure of a package set.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::{OutputFormat, load_graph};
use crate::aggregate::AggregateId;
use crate::cache::CacheBuilder;
use crate::core::AggError;
use crate::graph::{PackageGraph, PackageIndex};

/// Print the aggregate identity and closure of the named packages.
#[derive(Args, Debug)]
pub struct ClosureCommand {
    /// Graph manifest listing the packages.
    #[arg(long, value_name = "FILE")]
    pub graph: PathBuf,

    /// Package names.
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Output format: text or json.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ClosureReport {
    id: AggregateId,
    members: Vec<String>,
    closure: Vec<String>,
}

impl ClosureCommand {
    /// Resolve the names, register the set and print its closure.
    pub fn execute(self) -> Result<()> {
        let graph = load_graph(&self.graph)?;

        let members = self
            .packages
            .iter()
            .map(|name| {
                graph.find(name).map(|p| p.index()).ok_or_else(|| AggError::PackageNotFound {
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<PackageIndex>, AggError>>()?;

        let mut cache = CacheBuilder::new().build(graph);
        let id = cache.register_aggregate(members);
        let closure = cache.get_closure(id);

        let report = ClosureReport {
            id,
            members: names(cache.graph(), &cache.members(&id)),
            closure: names(cache.graph(), &closure),
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => {
                println!("{} {}", "members:".dimmed(), report.members.join(", "));
                println!("{} {}", "id:".dimmed(), report.id);
                println!(
                    "{} {} ({} packages)",
                    "closure:".dimmed(),
                    report.closure.join(", ").cyan(),
                    report.closure.len()
                );
            }
        }
        Ok(())
    }
}

fn names(graph: &PackageGraph, indices: &[PackageIndex]) -> Vec<String> {
    indices.iter().map(|&index| graph.package(index).name().to_string()).collect()
}
