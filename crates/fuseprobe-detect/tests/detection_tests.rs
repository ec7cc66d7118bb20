//! Generate, profile and detect, end to end.

use std::time::Duration;

use fuseprobe_catalog::RuleCatalog;
use fuseprobe_common::{LatencyObservation, RuleTestConfig};
use fuseprobe_detect::{Detector, RuleOutcome, RuleStatus};
use fuseprobe_ops::DescriptorModelBuilder;
use fuseprobe_profiler::{ProfilingCoordinator, ScriptedProfiler, ProfileSample};
use fuseprobe_testcase::{Role, SkipReason, TestCaseGenerator, TestCases};
use indexmap::IndexMap;
use proptest::prelude::*;

const RULES: [&str; 3] = ["BF_conv_bn", "BF_bn_relu", "CF_conv_bn_relu"];

fn generate(config: &RuleTestConfig, dir: &std::path::Path) -> TestCases {
    let catalog = RuleCatalog::from_config(config).unwrap();
    let templates = catalog.list_rules(&RULES).unwrap();
    let builder = DescriptorModelBuilder::new();
    let report = TestCaseGenerator::new(config, dir.join("models")).with_builder(&builder).generate(&templates);
    assert!(report.skipped.is_empty());
    report.test_cases
}

fn scripted(conv_bn_block: f64) -> ScriptedProfiler {
    ScriptedProfiler::constant(ProfileSample::new(1.0, 0.0, 10))
        .with_mean("BF_conv_bn_opA", 10.0)
        .with_mean("BF_conv_bn_opB", 4.0)
        .with_mean("BF_conv_bn_block", conv_bn_block)
        .with_mean("BF_bn_relu_opA", 4.0)
        .with_mean("BF_bn_relu_opB", 2.0)
        .with_mean("BF_bn_relu_block", 5.9)
        .with_mean("CF_conv_bn_relu_opA", 12.0)
        .with_mean("CF_conv_bn_relu_opB", 2.0)
        .with_mean("CF_conv_bn_relu_block", 6.0)
}

fn run_pipeline(conv_bn_block: f64) -> fuseprobe_detect::DetectionReport {
    let dir = tempfile::tempdir().unwrap();
    let config = RuleTestConfig::default();
    let mut cases = generate(&config, dir.path());
    let mut profiler = scripted(conv_bn_block);
    let profiled = ProfilingCoordinator::new(Duration::from_secs(5)).run(&mut cases, &mut profiler).unwrap();
    assert_eq!(profiled.failed, 0);
    Detector::new(config.default_eps).detect(&cases).unwrap()
}

#[test]
fn fused_prerequisite_enables_chain_rule() {
    let report = run_pipeline(5.0);
    assert_eq!(report.status("BF_conv_bn"), Some(RuleStatus::Fused));
    assert_eq!(report.status("BF_bn_relu"), Some(RuleStatus::NotFused));
    assert_eq!(report.status("CF_conv_bn_relu"), Some(RuleStatus::Fused));

    let verdict = report.get("BF_conv_bn").and_then(RuleOutcome::verdict).unwrap();
    assert_eq!(verdict.threshold, 7.0);
    assert_eq!(verdict.margin, 2.0);
}

#[test]
fn unfused_prerequisite_blocks_chain_rule() {
    let report = run_pipeline(9.0);
    assert_eq!(report.status("BF_conv_bn"), Some(RuleStatus::NotFused));
    assert_eq!(
        report.get("CF_conv_bn_relu"),
        Some(&RuleOutcome::NotApplicable { blocked_by: vec!["BF_conv_bn".to_string()] })
    );
    let counts = report.counts();
    assert_eq!((counts.not_fused, counts.not_applicable, counts.total()), (2, 1, 3));
}

#[test]
fn snapshot_detection_report() {
    let config = RuleTestConfig::default();
    let catalog = RuleCatalog::from_config(&config).unwrap();
    let templates = catalog.list_rules(&RULES).unwrap();
    let mut cases = TestCaseGenerator::new(&config, "fusion_rule_test/models").generate(&templates).test_cases;

    let latencies = [
        ("BF_conv_bn", [10.0, 4.0, 9.0]),
        ("BF_bn_relu", [4.0, 2.0, 2.0]),
        ("CF_conv_bn_relu", [12.0, 2.0, 6.0]),
    ];
    for (rule, means) in latencies {
        for (role, mean) in Role::ALL.into_iter().zip(means) {
            cases[rule].model_mut(role).latency = Some(LatencyObservation::new(mean, 0.5));
        }
    }

    let mut report = Detector::new(0.5).detect(&cases).unwrap();
    let mut skipped = IndexMap::new();
    skipped.insert(
        "BF_dense_relu".to_string(),
        SkipReason::ShapeMismatch {
            role: Role::OpA,
            message: "dense needs a rank-1 input, got 28x28x16".to_string(),
        },
    );
    report.merge_generation_failures(&skipped);

    insta::assert_json_snapshot!("detection_report", report);
}

proptest! {
    #[test]
    fn verdict_matches_decision_rule(
        a in 0.01f64..100.0,
        b in 0.01f64..100.0,
        block in 0.0f64..200.0,
        eps in 0.0f64..0.99,
    ) {
        let config = RuleTestConfig::default();
        let catalog = RuleCatalog::from_config(&config).unwrap();
        let templates = catalog.list_rules(&["BF_conv_relu"]).unwrap();
        let mut cases = TestCaseGenerator::new(&config, "models").generate(&templates).test_cases;
        for (role, mean) in Role::ALL.into_iter().zip([a, b, block]) {
            cases["BF_conv_relu"].model_mut(role).latency = Some(LatencyObservation::new(mean, 0.0));
        }

        let report = Detector::new(eps).detect(&cases).unwrap();
        let verdict = report.get("BF_conv_relu").and_then(RuleOutcome::verdict).unwrap();
        prop_assert_eq!(verdict.fused, block < (a + b) * (1.0 - eps));
        prop_assert_eq!(verdict.fused, verdict.margin > 0.0);
    }
}
