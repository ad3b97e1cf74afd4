use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert!(config.manifest.path.is_none());
    assert!(config.manifest.root.is_none());
    assert_eq!(config.output.format, OutputFormat::Tree);

    let logging = config.logging.as_ref().unwrap();
    let default_section = &logging["default"];
    assert_eq!(default_section.console_level, "warn");
    assert!(default_section.file.is_empty());
}

#[test]
fn test_yaml_serialization() {
    let yaml = AppConfig::default().to_yaml().unwrap();
    assert!(yaml.contains("manifest:"));
    assert!(yaml.contains("format: tree"));
    assert!(yaml.contains("logging:"));
}

#[test]
fn test_layered_loading_yaml_only() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("wirekit.yaml");
    let yaml = r#"
manifest:
  path: "app/manifest.yaml"
output:
  format: json
logging:
  default:
    console_level: debug
    file: "logs/wirekit.log"
  wirekit:
    console_level: trace
"#;
    fs::write(&config_path, yaml).unwrap();

    let config = AppConfig::load_layered(&config_path).unwrap();

    let expected = dir.path().join("app/manifest.yaml");
    assert_eq!(config.manifest_path().unwrap(), expected);
    assert_eq!(config.output.format, OutputFormat::Json);

    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "debug");
    assert_eq!(logging["default"].file, "logs/wirekit.log");
    assert_eq!(logging["wirekit"].console_level, "trace");
    assert!(logging["wirekit"].file.is_empty());
}

#[test]
fn test_minimal_yaml_keeps_optional_sections_empty() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("empty.yaml");
    fs::write(&config_path, "output:\n  format: yaml\n").unwrap();

    let config = AppConfig::load_layered(&config_path).unwrap();
    assert_eq!(config.output.format, OutputFormat::Yaml);
    assert!(config.manifest.path.is_none());
    assert!(config.logging.is_none());
}

#[test]
fn test_absolute_manifest_path_untouched() {
    let dir = tempdir().unwrap();
    let manifest = dir.path().join("abs.yaml");
    let config_path = dir.path().join("cfg.yaml");
    fs::write(
        &config_path,
        format!("manifest:\n  path: {:?}\n", manifest.to_string_lossy()),
    )
    .unwrap();

    let config = AppConfig::load_layered(&config_path).unwrap();
    assert_eq!(config.manifest_path().unwrap(), manifest);
}

#[test]
fn test_env_overrides_yaml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("env.yaml");
    fs::write(&config_path, "manifest:\n  root: YamlRoot\n").unwrap();

    std::env::set_var("WIREKIT__MANIFEST__ROOT", "EnvRoot");
    let config = AppConfig::load_layered(&config_path);
    std::env::remove_var("WIREKIT__MANIFEST__ROOT");

    assert_eq!(config.unwrap().manifest.root.as_deref(), Some("EnvRoot"));
}

#[test]
fn test_overriding_layer_path_is_not_rebased() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("cfg.yaml");
    fs::write(&config_path, "manifest:\n  path: from-yaml.yaml\n").unwrap();

    let config = AppConfig::load_layered(&config_path).unwrap();
    assert_eq!(config.manifest_path().unwrap(), dir.path().join("from-yaml.yaml"));

    use figment::providers::{Format, Yaml};
    let layer = Yaml::string("manifest:\n  path: rel/app.yaml\n");
    let config = config.merge_layer(layer).unwrap();
    assert_eq!(config.manifest_path().unwrap(), PathBuf::from("rel/app.yaml"));
    assert_eq!(config.output.format, OutputFormat::Tree);
}

#[test]
fn test_unknown_fields_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.yaml");
    fs::write(&config_path, "server:\n  port: 8080\n").unwrap();

    assert!(AppConfig::load_layered(&config_path).is_err());
}

#[test]
fn test_cli_overrides() {
    let mut config = AppConfig::default();
    let args = CliArgs {
        manifest: Some("shop.json".to_string()),
        root: Some("ShopModule".to_string()),
        format: Some(OutputFormat::Yaml),
        verbose: 2,
        ..CliArgs::default()
    };

    config.apply_cli_overrides(&args);

    assert_eq!(config.manifest.path.as_deref(), Some("shop.json"));
    assert_eq!(config.manifest.root.as_deref(), Some("ShopModule"));
    assert_eq!(config.output.format, OutputFormat::Yaml);
    assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");
}

#[test]
fn test_cli_verbose_levels_matrix() {
    for (verbose, expected) in [(0, "warn"), (1, "info"), (2, "debug"), (3, "trace"), (4, "trace")] {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            verbose,
            ..CliArgs::default()
        });
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, expected, "verbose={verbose}");
    }
}

#[test]
fn test_missing_manifest_is_reported() {
    let err = AppConfig::default().manifest_path().unwrap_err();
    assert!(err.to_string().contains("--manifest"));
}

#[test]
fn test_output_format_from_str() {
    assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    assert!("xml".parse::<OutputFormat>().is_err());
}
