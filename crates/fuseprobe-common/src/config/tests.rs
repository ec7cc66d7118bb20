use super::*;

#[test]
fn test_defaults_are_valid() {
    let config = FuseProbeConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.ruletest.default_input_shape, vec![28, 28, 16]);
    assert_eq!(config.ruletest.default_eps, 0.5);
    assert_eq!(config.backend.name, "simulated");
    assert_eq!(config.backend.timeout(), Duration::from_secs(300));
}

#[test]
fn test_toml_roundtrip() {
    let mut config = FuseProbeConfig::default();
    config.ruletest.cout = Some(32);
    config.ruletest.rules.push(RuleDecl {
        name: "dw_then_add".to_string(),
        category: Some("Custom".to_string()),
        op_a: vec!["dwconv".to_string()],
        op_b: vec!["add".to_string()],
        prerequisites: vec![],
        params: [("eps".to_string(), 0.1)].into_iter().collect(),
        overrides: OpOverrides { strides: Some(2), ..OpOverrides::default() },
    });

    let text = config.to_toml().unwrap();
    let back: FuseProbeConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let config: FuseProbeConfig = toml::from_str(
        r#"
        [ruletest]
        default_eps = 0.2
        enabled = ["BF_conv"]

        [backend]
        name = "command"
        command = "adb"
        args = ["shell", "benchmark_model", "--graph={model}"]
        "#,
    )
    .unwrap();
    assert_eq!(config.ruletest.default_eps, 0.2);
    assert_eq!(config.ruletest.kernel_size, 3);
    assert_eq!(config.ruletest.enabled, vec!["BF_conv".to_string()]);
    assert_eq!(config.backend.command.as_deref(), Some("adb"));
    assert_eq!(config.backend.timeout_secs, 300);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_validate_rejects_bad_eps() {
    for eps in [-0.1, 1.0, 1.5] {
        let mut config = FuseProbeConfig::default();
        config.ruletest.default_eps = eps;
        assert!(config.validate().is_err(), "eps {eps} should be rejected");
    }
}

#[test]
fn test_validate_rejects_zero_dimension() {
    let mut config = FuseProbeConfig::default();
    config.ruletest.default_input_shape = vec![28, 0, 16];
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("default_input_shape"));
}

#[test]
fn test_validate_rejects_zero_timeout_and_bad_logging() {
    let mut config = FuseProbeConfig::default();
    config.backend.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = FuseProbeConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(config.validate().is_err());

    let mut config = FuseProbeConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = FuseProbeConfig::from_toml(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, FuseProbeConfig::default());
}
