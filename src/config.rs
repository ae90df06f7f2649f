use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::landmark::FeatureLayout;

const DEFAULT_POSE_MODEL: &str = "stub://zero";
const DEFAULT_TEMPORAL_MODEL: &str = "stub://motion";
const DEFAULT_LABELS_PATH: &str = "assets/pose_labels.txt";
const DEFAULT_SOURCE: &str = "stub://front_camera";
const DEFAULT_SEQUENCE_LENGTH: usize = 10;
const DEFAULT_DECISION_THRESHOLD: f32 = 0.3;
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Step used when a threshold is raised or lowered at runtime.
pub const CONFIDENCE_STEP: f32 = 0.1;
const DETECTION_BOUNDS: (f32, f32) = (0.2, 0.8);
const TRACKING_BOUNDS: (f32, f32) = (0.2, 0.8);
const PRESENCE_BOUNDS: (f32, f32) = (0.2, 0.9);

/// Compute backend executing model inference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for Delegate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Delegate::Cpu),
            "gpu" => Ok(Delegate::Gpu),
            other => Err(anyhow!("unknown delegate '{}' (expected cpu or gpu)", other)),
        }
    }
}

/// Pose landmarker model variant requested from the upstream detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    Lite,
    #[default]
    Full,
    Heavy,
}

impl FromStr for ModelVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lite" => Ok(ModelVariant::Lite),
            "full" => Ok(ModelVariant::Full),
            "heavy" => Ok(ModelVariant::Heavy),
            other => Err(anyhow!(
                "unknown model variant '{}' (expected lite, full or heavy)",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    delegate: Option<Delegate>,
    sequence_length: Option<usize>,
    decision_threshold: Option<f32>,
    models: Option<ModelsConfigFile>,
    detector: Option<DetectorConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelsConfigFile {
    pose_classifier: Option<String>,
    temporal_classifier: Option<String>,
    labels: Option<PathBuf>,
    pose_layout: Option<FeatureLayout>,
    temporal_layout: Option<FeatureLayout>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    variant: Option<ModelVariant>,
    min_detection_confidence: Option<f32>,
    min_tracking_confidence: Option<f32>,
    min_presence_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    uri: Option<String>,
    live: Option<bool>,
}

/// Everything a `Session` is built from. Changing any field at runtime means a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub delegate: Delegate,
    /// Frames per person window (N).
    pub sequence_length: usize,
    /// Temporal score strictly above this is positive.
    pub decision_threshold: f32,
    pub models: ModelSettings,
    pub detector: DetectorSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub pose_classifier: String,
    pub temporal_classifier: String,
    pub labels: PathBuf,
    pub pose_layout: FeatureLayout,
    pub temporal_layout: FeatureLayout,
}

/// Settings forwarded to the upstream landmark detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorSettings {
    pub variant: ModelVariant,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub min_presence_confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    /// `stub://<name>`, a local JSON-lines path, or `-` for stdin.
    pub uri: String,
    /// Live sources use keep-latest delivery; batch sources are processed frame by frame.
    pub live: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delegate: Delegate::Cpu,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            models: ModelSettings::default(),
            detector: DetectorSettings::default(),
            source: SourceSettings::default(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            pose_classifier: DEFAULT_POSE_MODEL.to_string(),
            temporal_classifier: DEFAULT_TEMPORAL_MODEL.to_string(),
            labels: PathBuf::from(DEFAULT_LABELS_PATH),
            pose_layout: FeatureLayout::Xyz,
            temporal_layout: FeatureLayout::Xyz,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            variant: ModelVariant::Full,
            min_detection_confidence: DEFAULT_CONFIDENCE,
            min_tracking_confidence: DEFAULT_CONFIDENCE,
            min_presence_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SOURCE.to_string(),
            live: true,
        }
    }
}

impl DetectorSettings {
    pub fn raise_detection(&mut self) {
        self.min_detection_confidence = step_up(self.min_detection_confidence, DETECTION_BOUNDS);
    }

    pub fn lower_detection(&mut self) {
        self.min_detection_confidence = step_down(self.min_detection_confidence, DETECTION_BOUNDS);
    }

    pub fn raise_tracking(&mut self) {
        self.min_tracking_confidence = step_up(self.min_tracking_confidence, TRACKING_BOUNDS);
    }

    pub fn lower_tracking(&mut self) {
        self.min_tracking_confidence = step_down(self.min_tracking_confidence, TRACKING_BOUNDS);
    }

    pub fn raise_presence(&mut self) {
        self.min_presence_confidence = step_up(self.min_presence_confidence, PRESENCE_BOUNDS);
    }

    pub fn lower_presence(&mut self) {
        self.min_presence_confidence = step_down(self.min_presence_confidence, PRESENCE_BOUNDS);
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
            ("min_presence_confidence", self.min_presence_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("detector.{} must be within 0.0..=1.0", name));
            }
        }
        Ok(())
    }
}

// Values at or past a guard stay put; rounding keeps repeated steps on the 0.1 grid.
fn step_up(value: f32, (_, ceiling): (f32, f32)) -> f32 {
    if value >= ceiling - f32::EPSILON {
        return value;
    }
    round_tenth(value + CONFIDENCE_STEP).min(ceiling)
}

fn step_down(value: f32, (floor, _): (f32, f32)) -> f32 {
    if value <= floor + f32::EPSILON {
        return value;
    }
    round_tenth(value - CONFIDENCE_STEP).max(floor)
}

fn round_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

impl PipelineConfig {
    /// Load from the file named by `POSE_CONFIG` (if any), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = non_empty_env("POSE_CONFIG").map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Load from an explicit config file (if any), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let defaults = Self::default();
        let models = file.models.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        Self {
            delegate: file.delegate.unwrap_or(defaults.delegate),
            sequence_length: file.sequence_length.unwrap_or(defaults.sequence_length),
            decision_threshold: file
                .decision_threshold
                .unwrap_or(defaults.decision_threshold),
            models: ModelSettings {
                pose_classifier: models
                    .pose_classifier
                    .unwrap_or(defaults.models.pose_classifier),
                temporal_classifier: models
                    .temporal_classifier
                    .unwrap_or(defaults.models.temporal_classifier),
                labels: models.labels.unwrap_or(defaults.models.labels),
                pose_layout: models.pose_layout.unwrap_or(defaults.models.pose_layout),
                temporal_layout: models
                    .temporal_layout
                    .unwrap_or(defaults.models.temporal_layout),
            },
            detector: DetectorSettings {
                variant: detector.variant.unwrap_or(defaults.detector.variant),
                min_detection_confidence: detector
                    .min_detection_confidence
                    .unwrap_or(defaults.detector.min_detection_confidence),
                min_tracking_confidence: detector
                    .min_tracking_confidence
                    .unwrap_or(defaults.detector.min_tracking_confidence),
                min_presence_confidence: detector
                    .min_presence_confidence
                    .unwrap_or(defaults.detector.min_presence_confidence),
            },
            source: SourceSettings {
                uri: source.uri.unwrap_or(defaults.source.uri),
                live: source.live.unwrap_or(defaults.source.live),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(delegate) = non_empty_env("POSE_DELEGATE") {
            self.delegate = delegate.parse()?;
        }
        if let Some(variant) = non_empty_env("POSE_MODEL_VARIANT") {
            self.detector.variant = variant.parse()?;
        }
        if let Some(length) = non_empty_env("POSE_SEQUENCE_LENGTH") {
            self.sequence_length = length
                .parse()
                .map_err(|_| anyhow!("POSE_SEQUENCE_LENGTH must be a positive integer"))?;
        }
        if let Some(threshold) = non_empty_env("POSE_DECISION_THRESHOLD") {
            self.decision_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("POSE_DECISION_THRESHOLD must be a number"))?;
        }
        if let Some(uri) = non_empty_env("POSE_SOURCE") {
            self.source.uri = uri;
        }
        if let Some(model) = non_empty_env("POSE_POSE_MODEL") {
            self.models.pose_classifier = model;
        }
        if let Some(model) = non_empty_env("POSE_TEMPORAL_MODEL") {
            self.models.temporal_classifier = model;
        }
        if let Some(path) = non_empty_env("POSE_LABELS") {
            self.models.labels = PathBuf::from(path);
        }
        if let Some(layout) = non_empty_env("POSE_POSE_LAYOUT") {
            self.models.pose_layout = layout.parse()?;
        }
        if let Some(layout) = non_empty_env("POSE_TEMPORAL_LAYOUT") {
            self.models.temporal_layout = layout.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(anyhow!("sequence_length must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(anyhow!("decision_threshold must be within 0.0..=1.0"));
        }
        if self.models.pose_classifier.trim().is_empty()
            || self.models.temporal_classifier.trim().is_empty()
        {
            return Err(anyhow!("model sources must not be empty"));
        }
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source.uri must not be empty"));
        }
        self.detector.validate()
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_threshold_steps_stop_at_guards() {
        let mut settings = DetectorSettings::default();
        for _ in 0..10 {
            settings.raise_detection();
        }
        assert_eq!(settings.min_detection_confidence, 0.8);

        for _ in 0..10 {
            settings.lower_detection();
        }
        assert_eq!(settings.min_detection_confidence, 0.2);
    }

    #[test]
    fn presence_threshold_ceiling_is_higher() {
        let mut settings = DetectorSettings::default();
        for _ in 0..10 {
            settings.raise_presence();
        }
        assert_eq!(settings.min_presence_confidence, 0.9);

        settings.raise_tracking();
        assert_eq!(settings.min_tracking_confidence, 0.6);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.sequence_length = 0;
        assert!(cfg.validate().is_err());

        cfg = PipelineConfig {
            decision_threshold: 1.5,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg = PipelineConfig::default();
        cfg.detector.min_tracking_confidence = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn delegate_and_variant_parse_case_insensitively() {
        assert_eq!("GPU".parse::<Delegate>().unwrap(), Delegate::Gpu);
        assert_eq!(" lite ".parse::<ModelVariant>().unwrap(), ModelVariant::Lite);
        assert!("tpu".parse::<Delegate>().is_err());
    }
}
