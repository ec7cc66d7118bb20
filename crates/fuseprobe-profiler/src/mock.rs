//! Scripted profiler for tests and dry runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fuseprobe_common::{ProfileError, Shape};

use crate::profiler::{ProfileSample, Profiler};

/// Returns pre-set results keyed by artifact file name and records every call.
#[derive(Debug, Clone)]
pub struct ScriptedProfiler {
    default: Result<ProfileSample, ProfileError>,
    results: HashMap<String, Result<ProfileSample, ProfileError>>,
    calls: Vec<PathBuf>,
}

impl ScriptedProfiler {
    /// Every artifact without its own script gets `sample`.
    pub fn constant(sample: ProfileSample) -> Self {
        Self { default: Ok(sample), results: HashMap::new(), calls: Vec::new() }
    }

    /// Every artifact without its own script fails with `err`.
    pub fn failing(err: ProfileError) -> Self {
        Self { default: Err(err), results: HashMap::new(), calls: Vec::new() }
    }

    /// Script the result for artifacts whose file stem is `stem`
    /// (for example `BF_conv_relu_block`).
    pub fn with_result(
        mut self,
        stem: impl Into<String>,
        result: Result<ProfileSample, ProfileError>,
    ) -> Self {
        self.results.insert(stem.into(), result);
        self
    }

    /// Shorthand for a successful mean latency with zero spread.
    pub fn with_mean(self, stem: impl Into<String>, mean_ms: f64) -> Self {
        self.with_result(stem, Ok(ProfileSample::new(mean_ms, 0.0, 10)))
    }

    /// Artifacts profiled so far, in call order.
    pub fn calls(&self) -> &[PathBuf] {
        &self.calls
    }
}

impl Profiler for ScriptedProfiler {
    fn name(&self) -> &str {
        "scripted"
    }

    fn profile(
        &mut self,
        artifact: &Path,
        _shapes: &[Shape],
        _timeout: Duration,
    ) -> Result<ProfileSample, ProfileError> {
        self.calls.push(artifact.to_path_buf());
        let stem = artifact.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        self.results.get(&stem).unwrap_or(&self.default).clone()
    }
}
