use crate::classify::labels::LabelTable;
use crate::error::PoseError;
use crate::model::ModelBackend;

/// Returned when every output of the model is exactly zero.
pub const NOT_RECOGNIZED: &str = "Not recognized";
/// Returned while the backing model is missing.
pub const MODEL_UNAVAILABLE: &str = "Model unavailable";
/// Returned when the forward pass fails.
pub const CLASSIFICATION_FAILED: &str = "Classification failed";

/// Learned per-frame pose classifier: one feature vector in, one label out.
pub struct PoseClassifier {
    model: Option<Box<dyn ModelBackend>>,
    labels: LabelTable,
    warned_uninitialized: bool,
}

impl PoseClassifier {
    /// Wrap a loaded model. Its output width must match the label table.
    pub fn new(model: Box<dyn ModelBackend>, labels: LabelTable) -> Result<Self, PoseError> {
        let outputs = model.shape().output_len();
        if outputs != labels.len() {
            return Err(PoseError::ShapeMismatch {
                expected: labels.len(),
                actual: outputs,
            });
        }
        Ok(Self {
            model: Some(model),
            labels,
            warned_uninitialized: false,
        })
    }

    /// A classifier whose model failed to load. Every call degrades to a sentinel.
    pub fn uninitialized(labels: LabelTable) -> Self {
        Self {
            model: None,
            labels,
            warned_uninitialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Classify one feature vector.
    pub fn classify(&mut self, features: &[f32]) -> Result<String, PoseError> {
        if features.is_empty() {
            return Err(PoseError::EmptyInput);
        }
        let model = self
            .model
            .as_mut()
            .ok_or(PoseError::ModelUninitialized("pose classifier"))?;
        let expected = model.shape().input_len();
        if features.len() != expected {
            return Err(PoseError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        let outputs = model
            .run(features)
            .map_err(|e| PoseError::InferenceFailure(format!("{:#}", e)))?;
        if let Some(bad) = outputs.iter().position(|v| !v.is_finite()) {
            return Err(PoseError::InferenceFailure(format!(
                "model output {} is {}",
                bad, outputs[bad]
            )));
        }
        let Some(index) = argmax(&outputs) else {
            return Ok(NOT_RECOGNIZED.to_string());
        };
        self.labels
            .get(index)
            .map(str::to_string)
            .ok_or_else(|| {
                PoseError::InferenceFailure(format!(
                    "output index {} outside label table of {}",
                    index,
                    self.labels.len()
                ))
            })
    }

    /// Like `classify`, but failures become descriptive sentinel labels.
    pub fn label_for(&mut self, features: &[f32]) -> String {
        match self.classify(features) {
            Ok(label) => label,
            Err(PoseError::ModelUninitialized(what)) => {
                if !self.warned_uninitialized {
                    log::warn!("{} has no model; reporting '{}'", what, MODEL_UNAVAILABLE);
                    self.warned_uninitialized = true;
                }
                MODEL_UNAVAILABLE.to_string()
            }
            Err(err @ (PoseError::EmptyInput | PoseError::ShapeMismatch { .. })) => {
                format!("Invalid input: {}", err)
            }
            Err(err) => {
                log::warn!("pose classification failed: {}", err);
                CLASSIFICATION_FAILED.to_string()
            }
        }
    }
}

/// Index of the first maximum, or `None` when every value is exactly zero.
/// Callers reject non-finite values first.
fn argmax(values: &[f32]) -> Option<usize> {
    if values.iter().all(|v| *v == 0.0) {
        return None;
    }
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelShape;
    use anyhow::{anyhow, Result};

    struct FixedModel {
        shape: ModelShape,
        output: Option<Vec<f32>>,
    }

    impl ModelBackend for FixedModel {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn shape(&self) -> ModelShape {
            self.shape
        }

        fn run(&mut self, _input: &[f32]) -> Result<Vec<f32>> {
            self.output.clone().ok_or_else(|| anyhow!("delegate lost"))
        }
    }

    fn labels() -> LabelTable {
        LabelTable::parse("0=standing\n1=sitting\n2=punching\n").unwrap()
    }

    fn classifier(output: Option<Vec<f32>>) -> PoseClassifier {
        let model = FixedModel {
            shape: ModelShape::per_frame(3),
            output,
        };
        PoseClassifier::new(Box::new(model), labels()).unwrap()
    }

    #[test]
    fn picks_highest_scoring_label() {
        let mut c = classifier(Some(vec![0.1, 0.7, 0.2]));
        assert_eq!(c.classify(&[0.0; 99]).unwrap(), "sitting");
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let mut c = classifier(Some(vec![0.2, 0.4, 0.4]));
        assert_eq!(c.classify(&[0.0; 99]).unwrap(), "sitting");
    }

    #[test]
    fn all_zero_output_is_not_recognized() {
        let mut c = classifier(Some(vec![0.0, 0.0, 0.0]));
        assert_eq!(c.classify(&[0.0; 99]).unwrap(), NOT_RECOGNIZED);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let mut c = classifier(Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(c.classify(&[]).unwrap_err(), PoseError::EmptyInput);
        assert_eq!(
            c.classify(&[0.0; 98]).unwrap_err(),
            PoseError::ShapeMismatch {
                expected: 99,
                actual: 98
            }
        );
        assert!(c.label_for(&[0.0; 98]).starts_with("Invalid input"));
    }

    #[test]
    fn missing_model_degrades_to_sentinel() {
        let mut c = PoseClassifier::uninitialized(labels());
        assert!(matches!(
            c.classify(&[0.0; 99]),
            Err(PoseError::ModelUninitialized(_))
        ));
        assert_eq!(c.label_for(&[0.0; 99]), MODEL_UNAVAILABLE);
        assert_eq!(c.label_for(&[0.0; 99]), MODEL_UNAVAILABLE);
    }

    #[test]
    fn inference_errors_become_failure_label() {
        let mut c = classifier(None);
        assert!(matches!(
            c.classify(&[0.0; 99]),
            Err(PoseError::InferenceFailure(_))
        ));
        assert_eq!(c.label_for(&[0.0; 99]), CLASSIFICATION_FAILED);
    }

    #[test]
    fn non_finite_output_is_an_inference_failure() {
        let mut c = classifier(Some(vec![f32::NAN, 0.9, 0.1]));
        assert!(matches!(
            c.classify(&[0.0; 99]),
            Err(PoseError::InferenceFailure(msg)) if msg.contains("output 0")
        ));
        assert_eq!(c.label_for(&[0.0; 99]), CLASSIFICATION_FAILED);

        let mut c = classifier(Some(vec![0.1, f32::INFINITY, 0.2]));
        assert!(matches!(
            c.classify(&[0.0; 99]),
            Err(PoseError::InferenceFailure(_))
        ));
    }

    #[test]
    fn output_width_must_match_label_table() {
        let model = FixedModel {
            shape: ModelShape::per_frame(5),
            output: None,
        };
        assert!(matches!(
            PoseClassifier::new(Box::new(model), labels()),
            Err(PoseError::ShapeMismatch {
                expected: 3,
                actual: 5
            })
        ));
    }
}
