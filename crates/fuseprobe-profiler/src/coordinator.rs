//! Profiling Coordinator.
//!
//! Visits every model of every test case in order and profiles the ones
//! without a latency. A failed call is written onto that model as `error`
//! and the sweep continues. Models that already carry a latency are never
//! profiled again, so the coordinator can be re-run on partial results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fuseprobe_common::{LatencyObservation, ProfileError, Shape, StoreError};
use fuseprobe_testcase::{save_test_cases, Role, TestCases};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::profiler::Profiler;

/// Progress event emitted before each profiling call.
#[derive(Debug, Clone)]
pub struct ProfileProgress {
    /// 0-based index of the call.
    pub step: usize,
    /// Calls planned in this run.
    pub total: usize,
    pub rule: String,
    pub role: Role,
}

/// Profiling state of one rule after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RuleProfileStatus {
    /// All three models carry a latency.
    Complete,
    /// At least one model has no latency; the reason per role.
    Failed { failures: BTreeMap<Role, String> },
}

/// Summary of a coordinator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub rules: IndexMap<String, RuleProfileStatus>,
    /// Models profiled successfully in this run.
    pub profiled: usize,
    /// Models skipped because they already had a latency.
    pub skipped: usize,
    /// Models whose profiling call failed in this run.
    pub failed: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl ProfileReport {
    pub fn complete_rules(&self) -> usize {
        self.rules.values().filter(|s| **s == RuleProfileStatus::Complete).count()
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = (&str, &BTreeMap<Role, String>)> {
        self.rules.iter().filter_map(|(name, status)| match status {
            RuleProfileStatus::Failed { failures } => Some((name.as_str(), failures)),
            RuleProfileStatus::Complete => None,
        })
    }
}

/// Drives profiling for a set of test cases.
pub struct ProfilingCoordinator {
    timeout: Duration,
    checkpoint: Option<PathBuf>,
    progress_cb: Option<Box<dyn Fn(ProfileProgress)>>,
}

impl ProfilingCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, checkpoint: None, progress_cb: None }
    }

    /// Save the test cases to `path` after each rule.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn with_progress(mut self, cb: impl Fn(ProfileProgress) + 'static) -> Self {
        self.progress_cb = Some(Box::new(cb));
        self
    }

    /// Profile every model that has no latency yet.
    ///
    /// Per-model failures are recorded, never returned. The only error is a
    /// failed checkpoint write.
    pub fn run(
        &self,
        cases: &mut TestCases,
        profiler: &mut dyn Profiler,
    ) -> Result<ProfileReport, StoreError> {
        let start = Instant::now();
        let total = cases
            .values()
            .flat_map(|c| c.models().map(|(_, m)| m))
            .filter(|m| !m.is_profiled())
            .count();
        tracing::info!(
            backend = profiler.name(),
            rules = cases.len(),
            pending = total,
            "profiling started"
        );

        let mut report = ProfileReport::default();
        let mut step = 0;
        for index in 0..cases.len() {
            let Some((rule, case)) = cases.get_index_mut(index) else {
                break;
            };
            let rule = rule.clone();
            for role in Role::ALL {
                let spec = case.model_mut(role);
                if spec.is_profiled() {
                    report.skipped += 1;
                    continue;
                }

                if let Some(cb) = &self.progress_cb {
                    cb(ProfileProgress { step, total, rule: rule.clone(), role });
                }
                step += 1;

                match self.profile_one(profiler, &spec.model, &spec.shapes) {
                    Ok((obs, samples, elapsed)) => {
                        tracing::debug!(
                            rule = %rule,
                            role = %role,
                            latency = %obs,
                            samples,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "model profiled"
                        );
                        spec.latency = Some(obs);
                        spec.samples = Some(samples);
                        spec.error = None;
                        report.profiled += 1;
                    }
                    Err(e) => {
                        tracing::warn!(rule = %rule, role = %role, error = %e, "profiling failed");
                        spec.error = Some(e.to_string());
                        report.failed += 1;
                    }
                }
            }

            let failures: BTreeMap<Role, String> = case
                .models()
                .filter(|(_, m)| !m.is_profiled())
                .map(|(r, m)| (r, m.error.clone().unwrap_or_else(|| "not profiled".to_string())))
                .collect();
            let status = if failures.is_empty() {
                RuleProfileStatus::Complete
            } else {
                RuleProfileStatus::Failed { failures }
            };
            report.rules.insert(rule, status);

            if let Some(path) = &self.checkpoint {
                save_test_cases(path, cases)?;
            }
        }

        report.elapsed = start.elapsed();
        tracing::info!(
            profiled = report.profiled,
            skipped = report.skipped,
            failed = report.failed,
            complete_rules = report.complete_rules(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "profiling finished"
        );
        Ok(report)
    }

    fn profile_one(
        &self,
        profiler: &mut dyn Profiler,
        artifact: &Path,
        shapes: &[Shape],
    ) -> Result<(LatencyObservation, u32, Duration), ProfileError> {
        let start = Instant::now();
        let sample = profiler.profile(artifact, shapes, self.timeout)?;
        let elapsed = start.elapsed();
        if elapsed > self.timeout {
            return Err(ProfileError::Timeout(self.timeout));
        }
        let obs = sample.validate()?;
        Ok((obs, sample.sample_count, elapsed))
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
