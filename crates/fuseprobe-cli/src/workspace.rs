//! On-disk layout of a fuseprobe workspace.
//!
//! ```text
//! <root>/fuseprobe.toml
//! <root>/fusion_rule_test/models/
//! <root>/fusion_rule_test/results/origin_testcases.json
//! <root>/fusion_rule_test/results/generation_failures.json
//! <root>/fusion_rule_test/results/profiled_results.json
//! <root>/fusion_rule_test/results/detected_fusion_rule.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fuseprobe_common::{ConfigError, FuseProbeConfig, CONFIG_FILE_NAME};

const TEST_DIR: &str = "fusion_rule_test";

/// Paths of one workspace rooted at `root`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config_override: Option<PathBuf>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), config_override: None }
    }

    /// Read configuration from `path` instead of `<root>/fuseprobe.toml`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_override = Some(path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_override.clone().unwrap_or_else(|| self.root.join(CONFIG_FILE_NAME))
    }

    pub fn model_dir(&self) -> PathBuf {
        self.root.join(TEST_DIR).join("models")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(TEST_DIR).join("results")
    }

    pub fn origin_testcases(&self) -> PathBuf {
        self.results_dir().join("origin_testcases.json")
    }

    pub fn generation_failures(&self) -> PathBuf {
        self.results_dir().join("generation_failures.json")
    }

    pub fn profiled_results(&self) -> PathBuf {
        self.results_dir().join("profiled_results.json")
    }

    pub fn detected_rules(&self) -> PathBuf {
        self.results_dir().join("detected_fusion_rule.json")
    }

    /// Create the directory tree and a default config.
    ///
    /// An existing config is only replaced when `force` is set. Returns
    /// whether a config file was written.
    pub fn create(&self, force: bool) -> Result<bool> {
        for dir in [self.model_dir(), self.results_dir()] {
            fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let config_path = self.config_path();
        if config_path.exists() && !force {
            tracing::info!(path = %config_path.display(), "keeping existing config");
            return Ok(false);
        }
        let text = FuseProbeConfig::default().to_toml()?;
        fs::write(&config_path, text)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        tracing::info!(path = %config_path.display(), "workspace created");
        Ok(true)
    }

    /// Load, override from the environment and validate the config.
    pub fn load_config(&self) -> Result<FuseProbeConfig, ConfigError> {
        FuseProbeConfig::load(&self.config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let ws = Workspace::new("/tmp/ws");
        assert_eq!(ws.config_path(), PathBuf::from("/tmp/ws/fuseprobe.toml"));
        assert_eq!(ws.model_dir(), PathBuf::from("/tmp/ws/fusion_rule_test/models"));
        assert_eq!(
            ws.detected_rules(),
            PathBuf::from("/tmp/ws/fusion_rule_test/results/detected_fusion_rule.json")
        );
        let ws = ws.with_config_path("/etc/fp.toml");
        assert_eq!(ws.config_path(), PathBuf::from("/etc/fp.toml"));
    }

    #[test]
    fn test_create_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert!(ws.create(false).unwrap());
        assert!(ws.model_dir().is_dir());
        assert!(ws.results_dir().is_dir());

        fs::write(ws.config_path(), "[logging]\nlevel = \"debug\"\n").unwrap();
        assert!(!ws.create(false).unwrap());
        assert!(fs::read_to_string(ws.config_path()).unwrap().contains("debug"));

        assert!(ws.create(true).unwrap());
        let config = FuseProbeConfig::from_toml(&ws.config_path()).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
