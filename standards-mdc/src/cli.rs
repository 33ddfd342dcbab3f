//! CLI glue for standards-mdc: argument parsing, config resolution and report output.
//!
//! All pipeline logic lives in `standards-mdc-core`. This module only turns
//! command-line input into a [`Config`], wires the HTTP fetcher and the
//! directory writer into [`synchronise`], and prints the resulting report.
//!
//! Running the binary without any argument is the same as `standards-mdc sync`
//! with the built-in defaults.

use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use standards_mdc_core::config::Config;
use standards_mdc_core::contract::WriteOutcome;
use standards_mdc_core::download::HttpFetcher;
use standards_mdc_core::synchronise::{synchronise, SynchroniseReport};
use standards_mdc_core::writer::DirectoryWriter;
use std::path::PathBuf;

/// CLI for standards-mdc: turn a published coding-standards document into editor rule files.
#[derive(Parser)]
#[clap(
    name = "standards-mdc",
    version,
    about = "Fetch a coding-standards document and write each rule as a Cursor .mdc rule file",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,

    #[clap(flatten)]
    pub sync: SyncArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the standards, extract the rules and write one file per rule (default)
    Sync(SyncArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Path to an optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory the rule files are written to (overrides config and environment)
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// Print the run report as JSON instead of a summary
    #[clap(long)]
    pub json: bool,
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("standards-mdc starting");

    let args = match cli.command {
        Some(Commands::Sync(args)) => args,
        None => cli.sync,
    };

    let config = resolve_config(&args)?;
    tracing::info!(command = "sync", "Starting synchronisation");

    let report = {
        let fetcher =
            HttpFetcher::new(&config.source).context("failed to set up the HTTP client")?;
        let writer = DirectoryWriter::new(&config.output.dir);
        synchronise(&config, &fetcher, &writer).await
    };

    match report {
        Ok(report) => {
            tracing::info!(command = "sync", rules = report.rules.len(), "Synchronisation complete");
            print_report(&report, &config, args.json)
        }
        Err(e) => {
            let e = anyhow::Error::new(e);
            tracing::error!(command = "sync", error = %format!("{e:#}"), "Synchronisation failed");
            Err(e)
        }
    }
}

/// Config file (or defaults), then environment, then command-line overrides.
pub fn resolve_config(args: &SyncArgs) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    config.trace_loaded();
    Ok(config)
}

fn print_report(report: &SynchroniseReport, config: &Config, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(report).context("failed to serialise the report")?;
        println!("{rendered}");
        return Ok(());
    }

    for rule in &report.rules {
        let verb = match rule.outcome {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "up to date",
        };
        println!("{verb:>10}  {}", rule.filename);
    }
    println!(
        "Fetched {} page(s); {} rule file(s) in {} ({} created, {} updated, {} up to date); {} section(s) skipped.",
        report.pages.len(),
        report.rules.len(),
        config.output.dir.display(),
        report.count(WriteOutcome::Created),
        report.count(WriteOutcome::Updated),
        report.count(WriteOutcome::Unchanged),
        report.warnings,
    );
    Ok(())
}
