//! Configuration management for the CLI

use anyhow::{Context, Result};
use audit_lib::{EvaluatorConfig, ReportMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Audit settings, layered from an optional file and `NUMA_AUDIT_*` env vars
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Default output field set
    pub mode: ReportMode,
    /// Evaluate VMs on a worker pool
    pub parallel: bool,
    /// Rule thresholds
    pub evaluator: EvaluatorConfig,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            mode: ReportMode::Full,
            parallel: true,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl AuditSettings {
    /// Load settings from the given file (or the default location) and the environment
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match override_path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("NUMA_AUDIT").separator("__"))
            .build()
            .context("Failed to load configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

/// `~/.config/numa-audit/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("numa-audit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = AuditSettings::default();
        assert_eq!(settings.mode, ReportMode::Full);
        assert!(settings.parallel);
        assert_eq!(settings.evaluator.default_numa_vcpu_min, 9);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "mode = \"simple\"\nparallel = false\n\n[evaluator]\nmin_vnuma_hardware_version = 9\n",
        )
        .unwrap();

        let settings = AuditSettings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.mode, ReportMode::Simple);
        assert!(!settings.parallel);
        assert_eq!(settings.evaluator.min_vnuma_hardware_version, 9);
        assert_eq!(settings.evaluator.default_numa_vcpu_min, 9);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(AuditSettings::load(Some(dir.path().join("nope.toml").as_path())).is_err());
    }
}
