//! Pipeline stages over a workspace.
//!
//! Each stage reads the artifact of the previous one from the results
//! directory and writes its own, so stages can be rerun independently.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use fuseprobe_catalog::RuleCatalog;
use fuseprobe_common::FuseProbeConfig;
use fuseprobe_detect::{DetectionReport, Detector, RuleStatus};
use fuseprobe_ops::DescriptorModelBuilder;
use fuseprobe_profiler::{BackendRegistry, ProfileProgress, ProfileReport, ProfilingCoordinator};
use fuseprobe_testcase::{
    evict_test_cases, load_test_cases, read_json, save_test_cases, write_json, GenerationReport,
    SkipReason, Stage, TestCaseGenerator, TestCases,
};
use indexmap::IndexMap;
use serde::Serialize;

use crate::workspace::Workspace;

/// Per-rule generation failures as persisted in `generation_failures.json`.
pub type GenerationFailures = IndexMap<String, SkipReason>;

/// Progress sink handed to the profiling coordinator.
pub type ProgressFn = Box<dyn Fn(ProfileProgress)>;

// ── Generate ────────────────────────────────────────────────────

/// Generate test cases for the rules selected by `filter`.
///
/// An empty `filter` falls back to `ruletest.enabled`. Test cases are merged
/// into `origin_testcases.json`; skipped rules replace their entry in
/// `generation_failures.json` and lose any earlier test case and measurement.
pub fn generate(ws: &Workspace, config: &FuseProbeConfig, filter: &[String]) -> Result<GenerationReport> {
    let catalog = RuleCatalog::from_config(&config.ruletest).context("invalid rule catalog")?;
    let filter = if filter.is_empty() { config.ruletest.enabled.as_slice() } else { filter };
    let templates = catalog.list_rules(filter).context("failed to select rules")?;

    let builder = DescriptorModelBuilder::new();
    let report = TestCaseGenerator::new(&config.ruletest, ws.model_dir())
        .with_builder(&builder)
        .generate(&templates);

    save_test_cases(&ws.origin_testcases(), &report.test_cases)?;
    let skipped: Vec<&str> = report.skipped.keys().map(String::as_str).collect();
    if !skipped.is_empty() {
        for path in [ws.origin_testcases(), ws.profiled_results()] {
            evict_test_cases(&path, &skipped)?;
        }
    }

    let mut failures = read_optional::<GenerationFailures>(&ws.generation_failures())?.unwrap_or_default();
    for rule in report.test_cases.keys() {
        failures.shift_remove(rule);
    }
    failures.extend(report.skipped.iter().map(|(rule, reason)| (rule.clone(), reason.clone())));
    write_json(&ws.generation_failures(), &failures)?;

    Ok(report)
}

// ── Profile ─────────────────────────────────────────────────────

/// Profile every generated model that has no latency yet.
///
/// Latencies already in `profiled_results.json` are carried over when the
/// model is unchanged, so a rerun only profiles what is missing or failed.
pub fn profile(
    ws: &Workspace,
    config: &FuseProbeConfig,
    registry: &BackendRegistry,
    progress: Option<ProgressFn>,
) -> Result<ProfileReport> {
    let origin = ws.origin_testcases();
    ensure!(origin.exists(), "no test cases at {}; run `fuseprobe generate` first", origin.display());
    let mut cases = load_test_cases(&origin)?;

    let profiled_path = ws.profiled_results();
    if let Some(previous) = read_optional::<TestCases>(&profiled_path)? {
        let adopted: usize = cases
            .iter_mut()
            .filter_map(|(rule, case)| previous.get(rule).map(|prev| case.adopt_measurements(prev)))
            .sum();
        tracing::info!(adopted, path = %profiled_path.display(), "reusing earlier measurements");
    }

    let mut profiler = registry
        .connect(&config.backend)
        .with_context(|| format!("failed to connect to backend `{}`", config.backend.name))?;

    let mut coordinator =
        ProfilingCoordinator::new(config.backend.timeout()).with_checkpoint(profiled_path.clone());
    if let Some(cb) = progress {
        coordinator = coordinator.with_progress(cb);
    }
    let report = coordinator.run(&mut cases, profiler.as_mut())?;
    save_test_cases(&profiled_path, &cases)?;
    Ok(report)
}

// ── Detect ──────────────────────────────────────────────────────

/// Decide every profiled rule and write `detected_fusion_rule.json`.
pub fn detect(ws: &Workspace, config: &FuseProbeConfig) -> Result<DetectionReport> {
    let profiled = ws.profiled_results();
    ensure!(profiled.exists(), "no profiled results at {}; run `fuseprobe profile` first", profiled.display());
    let cases = load_test_cases(&profiled)?;

    let mut report = Detector::new(config.ruletest.default_eps)
        .with_detail(config.ruletest.detail)
        .detect(&cases)
        .context("failed to order rules by prerequisite")?;
    if let Some(failures) = read_optional::<GenerationFailures>(&ws.generation_failures())? {
        report.merge_generation_failures(&failures);
    }

    write_json(&ws.detected_rules(), &report)?;
    Ok(report)
}

// ── Run ─────────────────────────────────────────────────────────

/// Results of a full generate → profile → detect pass.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generation: GenerationReport,
    pub profile: ProfileReport,
    pub detection: DetectionReport,
}

pub fn run(
    ws: &Workspace,
    config: &FuseProbeConfig,
    registry: &BackendRegistry,
    filter: &[String],
    progress: Option<ProgressFn>,
) -> Result<RunSummary> {
    let generation = generate(ws, config, filter)?;
    let profile = profile(ws, config, registry, progress)?;
    let detection = detect(ws, config)?;
    Ok(RunSummary { generation, profile, detection })
}

// ── Status ──────────────────────────────────────────────────────

/// Where one rule stands in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleState {
    pub rule: String,
    /// `None` when no test case could be generated.
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RuleStatus>,
}

/// State of every rule known to the workspace, in generation order.
pub fn status(ws: &Workspace) -> Result<Vec<RuleState>> {
    let origin = read_optional::<TestCases>(&ws.origin_testcases())?.unwrap_or_default();
    let profiled = read_optional::<TestCases>(&ws.profiled_results())?.unwrap_or_default();
    let detection = read_optional::<DetectionReport>(&ws.detected_rules())?;
    let failures = read_optional::<GenerationFailures>(&ws.generation_failures())?.unwrap_or_default();

    let mut states = Vec::with_capacity(origin.len() + failures.len());
    for (rule, case) in &origin {
        let case = profiled.get(rule).unwrap_or(case);
        let stage = match &detection {
            Some(report) => report.stage_of(rule, case),
            None => case.stage(),
        };
        let status = detection.as_ref().and_then(|report| report.status(rule));
        states.push(RuleState { rule: rule.clone(), stage: Some(stage), status });
    }
    for rule in failures.keys().filter(|rule| !origin.contains_key(*rule)) {
        states.push(RuleState { rule: rule.clone(), stage: None, status: Some(RuleStatus::Failed) });
    }
    Ok(states)
}

fn read_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(read_json(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace, FuseProbeConfig) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        ws.create(false).unwrap();
        let mut config = FuseProbeConfig::default();
        config.ruletest.enabled = vec!["BF_conv_bn".into(), "BF_bn_relu".into()];
        (dir, ws, config)
    }

    #[test]
    fn test_stages_require_their_inputs() {
        let (_dir, ws, config) = workspace();
        let registry = BackendRegistry::with_builtin();
        let err = profile(&ws, &config, &registry, None).unwrap_err();
        assert!(err.to_string().contains("run `fuseprobe generate` first"));
        let err = detect(&ws, &config).unwrap_err();
        assert!(err.to_string().contains("run `fuseprobe profile` first"));
        assert!(status(&ws).unwrap().is_empty());
    }

    #[test]
    fn test_generation_failures_are_replaced_per_rule() {
        let (_dir, ws, config) = workspace();
        let mut stale = GenerationFailures::new();
        stale.insert(
            "BF_conv_bn".into(),
            SkipReason::ModelBuild { role: fuseprobe_testcase::Role::OpA, message: "old".into() },
        );
        write_json(&ws.generation_failures(), &stale).unwrap();

        let report = generate(&ws, &config, &[]).unwrap();
        assert_eq!(report.test_cases.len(), 2);
        let failures: GenerationFailures = read_json(&ws.generation_failures()).unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn test_newly_failing_rule_replaces_its_old_verdict() {
        let (_dir, ws, mut config) = workspace();
        let registry = BackendRegistry::with_builtin();
        generate(&ws, &config, &[]).unwrap();
        profile(&ws, &config, &registry, None).unwrap();
        assert!(detect(&ws, &config).unwrap().get("BF_conv_bn").unwrap().verdict().is_some());

        config.ruletest.kernel_size = -3;
        let report = generate(&ws, &config, &["BF_conv_bn".to_string()]).unwrap();
        assert!(report.skipped.contains_key("BF_conv_bn"));
        assert!(!load_test_cases(&ws.origin_testcases()).unwrap().contains_key("BF_conv_bn"));
        assert!(!load_test_cases(&ws.profiled_results()).unwrap().contains_key("BF_conv_bn"));

        let detection = detect(&ws, &config).unwrap();
        assert_eq!(detection.status("BF_conv_bn"), Some(RuleStatus::Failed));
        assert!(detection.status("BF_bn_relu").is_some_and(|s| s != RuleStatus::Failed));

        let states = status(&ws).unwrap();
        let conv_bn = states.iter().find(|s| s.rule == "BF_conv_bn").unwrap();
        assert_eq!((conv_bn.stage, conv_bn.status), (None, Some(RuleStatus::Failed)));
    }

    #[test]
    fn test_status_tracks_each_stage() {
        let (_dir, ws, config) = workspace();
        let registry = BackendRegistry::with_builtin();

        generate(&ws, &config, &[]).unwrap();
        let states = status(&ws).unwrap();
        assert!(states.iter().all(|s| s.stage == Some(Stage::Generated) && s.status.is_none()));

        profile(&ws, &config, &registry, None).unwrap();
        assert!(status(&ws).unwrap().iter().all(|s| s.stage == Some(Stage::Profiled)));

        detect(&ws, &config).unwrap();
        let states = status(&ws).unwrap();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|s| s.stage == Some(Stage::Decided) && s.status.is_some()));
    }
}
