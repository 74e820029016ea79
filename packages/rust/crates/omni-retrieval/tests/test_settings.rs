#![allow(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

use omni_retrieval::{
    ConfigError, RetrievalConfig, load_retrieval_settings_file, load_retrieval_settings_from_paths,
};
use tempfile::TempDir;

fn write_file(path: PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write yaml");
}

#[test]
fn merge_user_overrides_system() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("packages/conf/retrieval.yaml");
    let user = tmp.path().join(".config/omni-dev-fusion/retrieval.yaml");

    write_file(
        system.clone(),
        r"
scoring:
  min_confidence_score: 0.25
  keyword_boost_factor: 1.4
limits:
  top_k: 8
  vector_top_k: 30
timeouts:
  embed_ms: 4000
  vector_ms: 2500
",
    );
    write_file(
        user.clone(),
        r"
scoring:
  keyword_boost_factor: 1.8
timeouts:
  vector_ms: 900
",
    );

    let config = load_retrieval_settings_from_paths(&system, &user)
        .into_config()
        .expect("valid merged settings");

    assert!((config.min_confidence_score - 0.25).abs() < f32::EPSILON);
    assert!((config.keyword_boost_factor - 1.8).abs() < f32::EPSILON);
    assert_eq!(config.top_k, 8);
    assert_eq!(config.vector_top_k, 30);
    assert_eq!(config.embed_timeout, Duration::from_millis(4000));
    assert_eq!(config.vector_timeout, Duration::from_millis(900));
    assert_eq!(
        config.keyword_timeout,
        RetrievalConfig::default().keyword_timeout
    );
}

#[test]
fn missing_files_yield_defaults() {
    let tmp = TempDir::new().expect("tempdir");
    let config = load_retrieval_settings_from_paths(
        &tmp.path().join("nope/system.yaml"),
        &tmp.path().join("nope/user.yaml"),
    )
    .into_config()
    .expect("defaults are valid");
    assert_eq!(config, RetrievalConfig::default());
}

#[test]
fn invalid_yaml_is_ignored() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("system.yaml");
    let user = tmp.path().join("user.yaml");
    write_file(system.clone(), "limits:\n  top_k: 3\n");
    write_file(user.clone(), "scoring: [not, a, map\n");

    let config = load_retrieval_settings_from_paths(&system, &user)
        .into_config()
        .expect("system file still applies");
    assert_eq!(config.top_k, 3);
}

#[test]
fn out_of_range_values_are_rejected() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("retrieval.yaml");
    write_file(path.clone(), "scoring:\n  keyword_boost_factor: 0.8\n");

    let err = load_retrieval_settings_file(&path)
        .into_config()
        .expect_err("boost below 1.0 must fail");
    assert_eq!(err, ConfigError::BoostFactor(0.8));

    write_file(path.clone(), "limits:\n  top_k: 80\n  max_top_k: 20\n");
    let err = load_retrieval_settings_file(&path)
        .into_config()
        .expect_err("top_k above cap must fail");
    assert_eq!(
        err,
        ConfigError::TopKAboveMax {
            top_k: 80,
            max_top_k: 20
        }
    );
}
