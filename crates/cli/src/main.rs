//! vNUMA Rightsizing Audit CLI
//!
//! A command-line tool that evaluates VM socket/core layouts against the
//! physical NUMA topology of their hosts and prints prioritized
//! recommendations.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{audit, hosts};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// vNUMA Rightsizing Audit CLI
#[derive(Parser)]
#[command(name = "numa-audit")]
#[command(author, version, about = "vNUMA Rightsizing Audit for virtual machine CPU topology", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/numa-audit/config.toml)
    #[arg(long, env = "NUMA_AUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit VM vCPU layouts against host NUMA topology
    Audit {
        /// Inventory file (JSON with vms, hosts and clusters)
        #[arg(long, short, env = "NUMA_AUDIT_INVENTORY")]
        inventory: PathBuf,

        /// Report only VM identity and recommendation fields
        #[arg(long)]
        simple: bool,

        /// Only evaluate VMs whose name contains this text
        #[arg(long)]
        vm: Option<String>,

        /// Evaluate VMs one at a time instead of on a worker pool
        #[arg(long)]
        sequential: bool,

        /// Only print VMs that are not optimized
        #[arg(long)]
        only_unoptimized: bool,

        /// Write Prometheus metrics in text format to this file
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Show the physical NUMA layout of every host
    Hosts {
        /// Inventory file (JSON with vms, hosts and clusters)
        #[arg(long, short, env = "NUMA_AUDIT_INVENTORY")]
        inventory: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Audit {
            inventory,
            simple,
            vm,
            sequential,
            only_unoptimized,
            metrics_file,
        } => {
            let settings = config::AuditSettings::load(cli.config.as_deref())?;
            let options = audit::AuditOptions {
                inventory,
                simple,
                vm_filter: vm,
                sequential,
                only_unoptimized,
                metrics_file,
            };
            audit::run_audit(&settings, options, cli.format).await?;
        }
        Commands::Hosts { inventory } => {
            hosts::show_hosts(&inventory, cli.format).await?;
        }
    }

    Ok(())
}
