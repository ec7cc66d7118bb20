//! Error types for the fusion-rule pipeline.
//!
//! Catalog-level errors are structural and abort a run. Shape, model-build and
//! profiling errors are scoped to a single rule or model and are aggregated
//! into reports by the stage that hits them.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::shape::Shape;

/// Top-level error for fuseprobe operations.
#[derive(Debug, Error)]
pub enum FuseProbeError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeMismatchError),

    #[error("Model build error: {0}")]
    ModelBuild(#[from] ModelBuildError),

    #[error("Profiling error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, FuseProbeError>;

/// Malformed rule catalogs or filters. Always fatal for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown rule `{name}` referenced by `{referenced_by}`")]
    UnknownRule { name: String, referenced_by: String },

    #[error("filter entry `{entry}` matches no rule template")]
    UnknownCategory { entry: String },

    #[error("cyclic rule prerequisites: {}", cycle.join(" -> "))]
    CyclicRule { cycle: Vec<String> },

    #[error("duplicate rule name `{name}`")]
    DuplicateRule { name: String },

    #[error("unknown operator `{name}` in `{context}`")]
    UnknownOp { name: String, context: String },

    #[error("invalid parameter `{key}` = {value} for rule `{rule}`: {reason}")]
    InvalidParam { rule: String, key: String, value: String, reason: String },

    #[error("invalid rule template `{name}`: {reason}")]
    InvalidTemplate { name: String, reason: String },
}

/// An operator received a tensor whose rank or shape it cannot consume.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operator `{op}` expects {expected}, got shape {found:?}")]
pub struct ShapeMismatchError {
    pub op: String,
    pub expected: String,
    pub found: Shape,
}

/// Invalid operator parameters or an artifact that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelBuildError {
    #[error("operator `{op}` has invalid {param} = {value}")]
    InvalidParameter { op: String, param: String, value: i64 },

    #[error("model has no layers")]
    Empty,

    #[error("failed to write model artifact {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("failed to read model artifact {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
}

/// Failure of a single profiling call. Recorded per model, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profiling timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("device error: {0}")]
    Device(String),

    #[error("could not parse profiler output: {0}")]
    Parse(String),

    #[error("invalid measurement: {0}")]
    InvalidMeasurement(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("unknown backend `{0}`")]
    UnknownBackend(String),

    #[error("backend misconfigured: {0}")]
    Misconfigured(String),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

/// Failures persisting or loading intermediate pipeline artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The `"<mean> +- <stddev>"` latency string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid latency string `{input}`: {reason}")]
pub struct LatencyParseError {
    pub input: String,
    pub reason: String,
}
