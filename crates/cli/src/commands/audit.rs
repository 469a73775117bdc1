//! Rightsizing audit command

use anyhow::{Context, Result};
use audit_lib::inventory::{InventoryProvider, JsonInventoryFile};
use audit_lib::{AuditMetrics, AuditReport, AuditRequest, Auditor, ReportMode, ResultRecord};
use std::path::PathBuf;
use tabled::Tabled;
use tracing::info;

use crate::config::AuditSettings;
use crate::output::{
    color_optimized, color_priority, format_gb, format_layout, format_opt, print_error,
    print_info, print_success, print_warning, truncate, OutputFormat,
};

/// Maximum characters of `details` shown in a table cell
const DETAILS_WIDTH: usize = 90;

/// Options of the `audit` command
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub inventory: PathBuf,
    pub simple: bool,
    pub vm_filter: Option<String>,
    pub sequential: bool,
    pub only_unoptimized: bool,
    pub metrics_file: Option<PathBuf>,
}

/// Row for the full report table
#[derive(Tabled)]
struct FullRow {
    #[tabled(rename = "VM")]
    vm: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Host NUMA")]
    host_numa: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Layout")]
    layout: String,
    #[tabled(rename = "Optimal")]
    optimal: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Optimized")]
    optimized: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Row for the simple report table
#[derive(Tabled)]
struct SimpleRow {
    #[tabled(rename = "VM")]
    vm: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Layout")]
    layout: String,
    #[tabled(rename = "Optimal")]
    optimal: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Optimized")]
    optimized: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Run the audit against an inventory file and print the report
pub async fn run_audit(settings: &AuditSettings, options: AuditOptions, format: OutputFormat) -> Result<()> {
    let provider = JsonInventoryFile::new(&options.inventory);
    let inventory = provider.fetch().await?;

    let request = AuditRequest {
        mode: if options.simple { ReportMode::Simple } else { settings.mode },
        vm_filter: options.vm_filter.clone(),
        parallel: settings.parallel && !options.sequential,
    };
    info!(
        inventory = %provider.describe(),
        mode = ?request.mode,
        parallel = request.parallel,
        "Running audit"
    );

    let evaluator_config = settings.evaluator.clone();
    let mut report = tokio::task::spawn_blocking(move || {
        Auditor::new(evaluator_config).run(&inventory, &request)
    })
    .await
    .context("Audit task failed")?;

    if options.only_unoptimized {
        report.results.retain(|r| !r.optimized());
    }

    if let Some(path) = &options.metrics_file {
        let text = AuditMetrics::new().render()?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write metrics file {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &AuditReport) {
    if report.results.is_empty() {
        print_warning("No VMs to report");
    } else {
        let mut table = match report.mode {
            ReportMode::Full => {
                let rows: Vec<FullRow> = report.results.iter().filter_map(full_row).collect();
                tabled::Table::new(rows)
            }
            ReportMode::Simple => {
                let rows: Vec<SimpleRow> = report.results.iter().map(simple_row).collect();
                tabled::Table::new(rows)
            }
        };
        println!("{}", table.with(tabled::settings::Style::rounded()));
    }

    for error in &report.errors {
        print_error(&format!("{}: {}", error.vm, error.reason));
    }
    for warning in &report.warnings {
        print_warning(&format!("{}: {}", warning.vm, warning.reason));
    }

    let s = &report.summary;
    println!();
    print_info(&format!(
        "{} VMs selected, {} evaluated, {} errors, {} warnings",
        s.selected, s.evaluated, s.errors, s.warnings
    ));
    if s.evaluated > 0 && s.optimized == s.evaluated {
        print_success("All evaluated VMs are optimized");
    } else if s.evaluated > 0 {
        print_info(&format!(
            "Priority: {} high, {} medium, {} low, {} optimized",
            s.high, s.medium, s.low, s.optimized
        ));
    }
}

fn full_row(record: &ResultRecord) -> Option<FullRow> {
    let ResultRecord::Full(r) = record else {
        return None;
    };
    Some(FullRow {
        vm: r.vm.clone(),
        cluster: format_opt(r.cluster.as_deref()),
        host: r.host.clone(),
        host_numa: format!(
            "{} / {}",
            format_layout(r.host_sockets, r.host_cores_per_socket),
            format_gb(r.host_mem_per_numa_node_gb)
        ),
        memory: format_gb(r.memory_gb),
        layout: format_layout(r.sockets, r.cores_per_socket),
        optimal: format_layout(r.optimal_sockets, r.optimal_cores_per_socket),
        priority: color_priority(r.priority),
        optimized: color_optimized(r.optimized),
        details: truncate(&r.details, DETAILS_WIDTH),
    })
}

fn simple_row(record: &ResultRecord) -> SimpleRow {
    let ((sockets, cores), (optimal_sockets, optimal_cores)) = record.layouts();
    let memory = match record {
        ResultRecord::Full(r) => r.memory_gb,
        ResultRecord::Simple(r) => r.memory_gb,
    };
    SimpleRow {
        vm: record.vm().to_string(),
        memory: format_gb(memory),
        layout: format_layout(sockets, cores),
        optimal: format_layout(optimal_sockets, optimal_cores),
        priority: color_priority(record.priority()),
        optimized: color_optimized(record.optimized()),
        details: truncate(record.details(), DETAILS_WIDTH),
    }
}
