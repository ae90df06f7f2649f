use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use pose_kernel::config::{Delegate, ModelVariant, PipelineConfig};
use pose_kernel::FeatureLayout;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "POSE_CONFIG",
        "POSE_DELEGATE",
        "POSE_MODEL_VARIANT",
        "POSE_SEQUENCE_LENGTH",
        "POSE_DECISION_THRESHOLD",
        "POSE_SOURCE",
        "POSE_POSE_MODEL",
        "POSE_TEMPORAL_MODEL",
        "POSE_LABELS",
        "POSE_POSE_LAYOUT",
        "POSE_TEMPORAL_LAYOUT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PipelineConfig::load().expect("load defaults");
    assert_eq!(cfg, PipelineConfig::default());
    assert_eq!(cfg.sequence_length, 10);
    assert_eq!(cfg.decision_threshold, 0.3);
    assert_eq!(cfg.delegate, Delegate::Cpu);
    assert_eq!(cfg.detector.min_presence_confidence, 0.5);
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "delegate": "gpu",
        "sequence_length": 16,
        "decision_threshold": 0.45,
        "models": {
            "pose_classifier": "models/pose.onnx",
            "temporal_classifier": "models/violence.onnx",
            "labels": "models/labels.txt",
            "temporal_layout": "xy_presence"
        },
        "detector": {
            "variant": "heavy",
            "min_detection_confidence": 0.7
        },
        "source": {
            "uri": "recordings/gym.jsonl",
            "live": false
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("POSE_CONFIG", file.path());
    std::env::set_var("POSE_DELEGATE", "cpu");
    std::env::set_var("POSE_SEQUENCE_LENGTH", "12");

    let cfg = PipelineConfig::load().expect("load config");

    assert_eq!(cfg.delegate, Delegate::Cpu);
    assert_eq!(cfg.sequence_length, 12);
    assert_eq!(cfg.decision_threshold, 0.45);
    assert_eq!(cfg.models.pose_classifier, "models/pose.onnx");
    assert_eq!(cfg.models.temporal_classifier, "models/violence.onnx");
    assert_eq!(cfg.models.labels.to_str(), Some("models/labels.txt"));
    assert_eq!(cfg.models.pose_layout, FeatureLayout::Xyz);
    assert_eq!(cfg.models.temporal_layout, FeatureLayout::XyPresence);
    assert_eq!(cfg.detector.variant, ModelVariant::Heavy);
    assert_eq!(cfg.detector.min_detection_confidence, 0.7);
    assert_eq!(cfg.detector.min_tracking_confidence, 0.5);
    assert_eq!(cfg.source.uri, "recordings/gym.jsonl");
    assert!(!cfg.source.live);

    clear_env();
}

#[test]
fn loads_toml_file_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
        sequence_length = 8
        decision_threshold = 0.5

        [detector]
        variant = "lite"

        [source]
        uri = "stub://porch"
    "#;
    file.write_all(toml.as_bytes()).expect("write config");

    std::env::set_var("POSE_CONFIG", file.path());
    std::env::set_var("POSE_SOURCE", "stub://garage");

    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg.sequence_length, 8);
    assert_eq!(cfg.decision_threshold, 0.5);
    assert_eq!(cfg.detector.variant, ModelVariant::Lite);
    assert_eq!(cfg.source.uri, "stub://garage");
    assert!(cfg.source.live);

    clear_env();
}

#[test]
fn rejects_unknown_keys_and_bad_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"sequence_len": 10}"#).expect("write config");
    std::env::set_var("POSE_CONFIG", file.path());
    assert!(PipelineConfig::load().is_err());
    clear_env();

    std::env::set_var("POSE_SEQUENCE_LENGTH", "0");
    assert!(PipelineConfig::load().is_err());
    clear_env();

    std::env::set_var("POSE_DELEGATE", "tpu");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("unknown delegate"));
    clear_env();

    std::env::set_var("POSE_DECISION_THRESHOLD", "high");
    assert!(PipelineConfig::load().is_err());
    clear_env();

    std::env::set_var("POSE_TEMPORAL_LAYOUT", "xyzw");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("unknown feature layout"));
    clear_env();
}

#[test]
fn layout_env_overrides_apply_per_classifier() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("POSE_TEMPORAL_LAYOUT", "XY_PRESENCE");
    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg.models.pose_layout, FeatureLayout::Xyz);
    assert_eq!(cfg.models.temporal_layout, FeatureLayout::XyPresence);

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("POSE_CONFIG", "/definitely/missing/pose.json");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
