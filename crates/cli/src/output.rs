//! Output formatting utilities

use audit_lib::Priority;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a size in GB, dropping the fraction when it is whole
pub fn format_gb(gb: f64) -> String {
    if gb.fract() == 0.0 {
        format!("{:.0} GB", gb)
    } else {
        format!("{:.1} GB", gb)
    }
}

/// Format an optional value, `-` when absent
pub fn format_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Format a socket layout as `sockets x cores`
pub fn format_layout(sockets: u32, cores_per_socket: u32) -> String {
    format!("{}x{}", sockets, cores_per_socket)
}

/// Color priority based on severity
pub fn color_priority(priority: Priority) -> String {
    let label = priority.as_str();
    match priority {
        Priority::High => label.red().bold().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.blue().to_string(),
        Priority::NotApplicable => label.green().to_string(),
    }
}

/// Color the optimized verdict
pub fn color_optimized(optimized: bool) -> String {
    if optimized {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

/// Shorten long text for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gb() {
        assert_eq!(format_gb(64.0), "64 GB");
        assert_eq!(format_gb(42.5), "42.5 GB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long message", 10), "a very ...");
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_layout(2, 8), "2x8");
        assert_eq!(format_opt(Some(4)), "4");
        assert_eq!(format_opt::<u32>(None), "-");
    }
}
