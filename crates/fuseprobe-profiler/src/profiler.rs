//! The profiler collaborator.

use std::path::Path;
use std::time::Duration;

use fuseprobe_common::{LatencyObservation, ProfileError, Shape};

/// Latency distribution returned by one profiling call, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    pub mean_ms: f64,
    pub stddev_ms: f64,
    pub sample_count: u32,
}

impl ProfileSample {
    pub fn new(mean_ms: f64, stddev_ms: f64, sample_count: u32) -> Self {
        Self { mean_ms, stddev_ms, sample_count }
    }

    /// Summarize raw per-run latencies.
    pub fn from_samples(samples: &[f64]) -> Result<Self, ProfileError> {
        let obs = LatencyObservation::from_samples(samples)
            .ok_or_else(|| ProfileError::Parse("no latency samples".to_string()))?;
        let count = u32::try_from(samples.len()).unwrap_or(u32::MAX);
        Ok(Self::new(obs.mean, obs.stddev, count))
    }

    /// Reject results a backend should never report as success.
    pub fn validate(&self) -> Result<LatencyObservation, ProfileError> {
        if self.sample_count == 0 {
            return Err(ProfileError::InvalidMeasurement("sample count is 0".to_string()));
        }
        let obs = LatencyObservation::new(self.mean_ms, self.stddev_ms);
        if !obs.is_valid() {
            return Err(ProfileError::InvalidMeasurement(format!(
                "mean {} / stddev {} must be finite and non-negative",
                self.mean_ms, self.stddev_ms
            )));
        }
        Ok(obs)
    }
}

/// Measures model artifacts on one device.
///
/// Calls are issued sequentially; implementations own the device handle and
/// must return within `timeout` or report [`ProfileError::Timeout`].
pub trait Profiler {
    /// Registry name of the backend.
    fn name(&self) -> &str;

    /// Check that the device is reachable within `timeout`.
    fn check_connection(&mut self, _timeout: Duration) -> Result<(), ProfileError> {
        Ok(())
    }

    fn profile(
        &mut self,
        artifact: &Path,
        shapes: &[Shape],
        timeout: Duration,
    ) -> Result<ProfileSample, ProfileError>;
}
