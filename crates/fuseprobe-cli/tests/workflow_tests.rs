//! Pipeline stages against a scripted backend.

use fuseprobe_cli::pipeline;
use fuseprobe_cli::Workspace;
use fuseprobe_common::{BackendConfig, FuseProbeConfig};
use fuseprobe_detect::RuleStatus;
use fuseprobe_profiler::{BackendRegistry, ProfileSample, ScriptedProfiler};
use fuseprobe_testcase::{load_test_cases, Role};
use serial_test::serial;

fn scripted_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::with_builtin();
    registry.register("scripted", "fixed latencies", |_| {
        Ok(Box::new(
            ScriptedProfiler::constant(ProfileSample::new(2.0, 0.1, 10))
                .with_mean("BF_conv_bn_opA", 10.0)
                .with_mean("BF_conv_bn_opB", 4.0)
                .with_mean("BF_conv_bn_block", 8.0),
        ))
    });
    registry
}

fn setup() -> (tempfile::TempDir, Workspace, FuseProbeConfig) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    ws.create(false).unwrap();
    let mut config = ws.load_config().unwrap();
    config.backend = BackendConfig { name: "scripted".into(), ..BackendConfig::default() };
    (dir, ws, config)
}

#[test]
#[serial]
fn eps_from_environment_changes_the_verdict() {
    let (_dir, ws, mut config) = setup();
    let filter = vec!["BF_conv_bn".to_string(), "CF_conv_bn_relu".to_string()];
    pipeline::run(&ws, &config, &scripted_registry(), &filter, None).unwrap();

    // 8 < (10 + 4) * 0.5 is false, so at the default eps the pair is not fused.
    let report = pipeline::detect(&ws, &config).unwrap();
    assert_eq!(report.status("BF_conv_bn"), Some(RuleStatus::NotFused));
    assert_eq!(report.status("CF_conv_bn_relu"), Some(RuleStatus::NotApplicable));

    temp_env::with_var("FUSEPROBE_DEFAULT_EPS", Some("0.3"), || {
        config.ruletest.default_eps = ws.load_config().unwrap().ruletest.default_eps;
    });
    assert_eq!(config.ruletest.default_eps, 0.3);

    // Chain rule latencies are all 2.0: block 2 < (2 + 2) * 0.7.
    let report = pipeline::detect(&ws, &config).unwrap();
    assert_eq!(report.status("BF_conv_bn"), Some(RuleStatus::Fused));
    assert_eq!(report.status("CF_conv_bn_relu"), Some(RuleStatus::Fused));
}

#[test]
#[serial]
fn profiling_resumes_from_earlier_results() {
    let (_dir, ws, config) = setup();
    let filter = vec!["BF_conv_bn".to_string()];
    pipeline::generate(&ws, &config, &filter).unwrap();
    let first = pipeline::profile(&ws, &config, &scripted_registry(), None).unwrap();
    assert_eq!(first.profiled, 3);

    // Regenerating the same rule keeps the models, so nothing is profiled again.
    pipeline::generate(&ws, &config, &filter).unwrap();
    let second = pipeline::profile(&ws, &config, &scripted_registry(), None).unwrap();
    assert_eq!((second.profiled, second.skipped), (0, 3));

    let cases = load_test_cases(&ws.profiled_results()).unwrap();
    let block = cases["BF_conv_bn"].model(Role::Block).latency.unwrap();
    assert_eq!(block.mean, 8.0);
}

#[test]
#[serial]
fn unknown_backend_is_reported() {
    let (_dir, ws, mut config) = setup();
    config.backend.name = "npu".into();
    pipeline::generate(&ws, &config, &["BF_bn_relu".to_string()]).unwrap();
    let err = pipeline::profile(&ws, &config, &BackendRegistry::with_builtin(), None).unwrap_err();
    assert_eq!(fuseprobe_cli::exit::exit_code_for(&err), fuseprobe_cli::exit::EXIT_BACKEND);
}

#[test]
#[serial]
fn regeneration_failure_replaces_an_earlier_verdict() {
    let (_dir, ws, mut config) = setup();
    config.ruletest.default_eps = 0.3;
    let filter = vec!["BF_conv_bn".to_string(), "BF_bn_relu".to_string()];
    let first = pipeline::run(&ws, &config, &scripted_registry(), &filter, None).unwrap();
    assert_eq!(first.detection.status("BF_conv_bn"), Some(RuleStatus::Fused));

    // A negative kernel no longer builds the conv, so the old case must not be decided again.
    config.ruletest.kernel_size = -3;
    let regenerated = pipeline::generate(&ws, &config, &filter[..1]).unwrap();
    assert!(regenerated.test_cases.is_empty());
    pipeline::detect(&ws, &config).unwrap();

    let detected: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.detected_rules()).unwrap()).unwrap();
    assert_eq!(detected["BF_conv_bn"]["status"], "failed");
    assert!(detected["BF_conv_bn"]["reason"].as_str().unwrap().contains("kernel_size"));
    assert_eq!(detected["BF_bn_relu"]["status"], "fused");
}
