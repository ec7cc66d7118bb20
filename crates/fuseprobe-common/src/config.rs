//! Configuration types and utilities
//!
//! A fuseprobe workspace carries one `fuseprobe.toml` with three tables:
//! `[ruletest]` (shapes, operator hyperparameters, enabled rule categories),
//! `[backend]` (which profiling backend to connect and how) and `[logging]`.
//! Every table has defaults, so an empty or missing file is a valid config.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::shape::Shape;

/// File name of the workspace configuration.
pub const CONFIG_FILE_NAME: &str = "fuseprobe.toml";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];

/// Main fuseprobe configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseProbeConfig {
    pub ruletest: RuleTestConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

/// Shapes and hyperparameters used to build test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTestConfig {
    /// Input shape (HWC) for rules whose first op takes an image tensor.
    pub default_input_shape: Shape,
    /// Input shape for rules whose first op takes a rank-1 tensor.
    pub d1_input_shape: Shape,
    pub kernel_size: i64,
    pub strides: i64,
    /// Pooling stride; falls back to `strides`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_strides: Option<i64>,
    /// Output channels; falls back to the input channel count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cout: Option<i64>,
    /// Decision tolerance for rules that do not set their own `eps`.
    pub default_eps: f64,
    /// Rule categories or name prefixes to test.
    pub enabled: Vec<String>,
    /// Two-op rules written `"a_b"`.
    pub basic_testcases: Vec<String>,
    /// Three-op chain rules written `"a_b_c"`, gated on `BF_a_b`.
    pub chain_testcases: Vec<String>,
    /// Keep per-role latencies in the detection artifact.
    pub detail: bool,
    /// User-declared rule templates.
    pub rules: Vec<RuleDecl>,
}

impl Default for RuleTestConfig {
    fn default() -> Self {
        Self {
            default_input_shape: vec![28, 28, 16],
            d1_input_shape: vec![428],
            kernel_size: 3,
            strides: 1,
            pool_strides: None,
            cout: None,
            default_eps: 0.5,
            enabled: vec!["BasicFusion".to_string(), "ChainFusion".to_string()],
            basic_testcases: [
                "conv_relu",
                "conv_relu6",
                "conv_hswish",
                "conv_bn",
                "conv_add",
                "conv_concat",
                "dwconv_relu",
                "dwconv_relu6",
                "dwconv_hswish",
                "dwconv_bn",
                "bn_relu",
                "dense_relu",
                "maxpool_relu",
                "avgpool_relu",
                "add_relu",
                "concat_relu",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chain_testcases: vec!["conv_bn_relu".to_string(), "dwconv_bn_relu".to_string()],
            detail: true,
            rules: Vec::new(),
        }
    }
}

/// Template-specific overrides of the global `[ruletest]` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Shape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strides: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_strides: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cout: Option<i64>,
}

/// A rule template declared in `[[ruletest.rules]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Op names of the first side; more than one forms a chain.
    pub op_a: Vec<String>,
    pub op_b: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Rule parameters such as `eps`.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub overrides: OpOverrides,
}

/// Profiling backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Registry name of the backend.
    pub name: String,
    /// Upper bound for a single profiling call.
    pub timeout_secs: u64,
    /// Program run by the `command` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments; `{model}` and `{shapes}` are substituted.
    pub args: Vec<String>,
    /// Program and arguments used to test the device connection.
    pub connection_check: Vec<String>,
    /// Samples reported by the `simulated` backend.
    pub samples: u32,
    /// Adjacent op pairs (`"a_b"`) the `simulated` backend executes as one kernel.
    pub fusible: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: "simulated".to_string(),
            timeout_secs: 300,
            command: None,
            args: Vec::new(),
            connection_check: Vec::new(),
            samples: 50,
            fusible: ["conv_relu", "conv_relu6", "conv_bn", "dwconv_relu", "dwconv_bn", "bn_relu"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// One of `pretty`, `compact`, `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl FuseProbeConfig {
    // ── Constructors ────────────────────────────────────────────

    /// Load configuration from a TOML file at `path`.
    ///
    /// If the file does not exist, returns `Ok(Self::default())`.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("Config file not found: {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Ok(toml::from_str(&text)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `FUSEPROBE_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = env::var("FUSEPROBE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = env::var("FUSEPROBE_BACKEND") {
            self.backend.name = v;
        }
        if let Ok(v) = env::var("FUSEPROBE_TIMEOUT_SECS") {
            self.backend.timeout_secs = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "FUSEPROBE_TIMEOUT_SECS".to_string(),
                reason: format!("`{v}` is not a whole number of seconds"),
            })?;
        }
        if let Ok(v) = env::var("FUSEPROBE_DEFAULT_EPS") {
            self.ruletest.default_eps = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "FUSEPROBE_DEFAULT_EPS".to_string(),
                reason: format!("`{v}` is not a number"),
            })?;
        }
        Ok(self)
    }

    /// Read the file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_toml(path)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    // ── Validation ──────────────────────────────────────────────

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rt = &self.ruletest;
        validate_shape("ruletest.default_input_shape", &rt.default_input_shape)?;
        validate_shape("ruletest.d1_input_shape", &rt.d1_input_shape)?;
        if !(0.0..1.0).contains(&rt.default_eps) {
            return Err(invalid(
                "ruletest.default_eps",
                format!("{} is outside [0, 1)", rt.default_eps),
            ));
        }
        for decl in &rt.rules {
            if decl.name.trim().is_empty() {
                return Err(invalid("ruletest.rules.name", "rule name cannot be empty"));
            }
            if let Some(shape) = &decl.overrides.input_shape {
                validate_shape(&format!("ruletest.rules.{}.input_shape", decl.name), shape)?;
            }
        }

        if self.backend.name.trim().is_empty() {
            return Err(invalid("backend.name", "backend name cannot be empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs", "timeout must be greater than 0"));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("`{}` is not one of {}", self.logging.level, VALID_LOG_LEVELS.join(", ")),
            ));
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(invalid(
                "logging.format",
                format!("`{}` is not one of {}", self.logging.format, VALID_LOG_FORMATS.join(", ")),
            ));
        }
        Ok(())
    }
}

fn validate_shape(key: &str, shape: &[usize]) -> Result<(), ConfigError> {
    if shape.is_empty() {
        return Err(invalid(key, "shape cannot be empty"));
    }
    if shape.contains(&0) {
        return Err(invalid(key, format!("shape {shape:?} has a zero dimension")));
    }
    Ok(())
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { key: key.to_string(), reason: reason.into() }
}

#[cfg(test)]
mod tests;
