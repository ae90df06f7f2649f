//! Temporal classifier adapter.
//!
//! Turns a ready person slot into a single forward pass of the sequence model
//! and the score into a binary verdict. Verdicts are fail-closed: any failure
//! on one slot reports `positive = false` for that slot only, and the next
//! cycle tries again.

use serde::Serialize;

use crate::buffer::{PersonKey, PersonSlot, SequenceBuffer};
use crate::error::PoseError;
use crate::model::ModelBackend;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemporalVerdict {
    pub person: PersonKey,
    /// Raw model score; absent when the slot was not evaluated.
    pub score: Option<f32>,
    pub positive: bool,
    /// False while the slot holds fewer than N frames.
    pub ready: bool,
}

pub struct TemporalClassifier {
    model: Option<Box<dyn ModelBackend>>,
    sequence_length: usize,
    threshold: f32,
    warned_uninitialized: bool,
}

impl TemporalClassifier {
    /// Wrap a loaded sequence model. Its input must be `sequence_length` frames wide.
    pub fn new(
        model: Box<dyn ModelBackend>,
        sequence_length: usize,
        threshold: f32,
    ) -> Result<Self, PoseError> {
        let expected = sequence_length * crate::landmark::FEATURE_WIDTH;
        let actual = model.shape().input_len();
        if actual != expected {
            return Err(PoseError::ShapeMismatch { expected, actual });
        }
        Ok(Self {
            model: Some(model),
            sequence_length,
            threshold,
            warned_uninitialized: false,
        })
    }

    /// A classifier whose model failed to load. Every verdict is negative.
    pub fn uninitialized(sequence_length: usize, threshold: f32) -> Self {
        Self {
            model: None,
            sequence_length,
            threshold,
            warned_uninitialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Decision rule: strictly above the threshold.
    pub fn is_positive(&self, score: f32) -> bool {
        score > self.threshold
    }

    /// Score one ready slot with a single forward pass.
    pub fn evaluate(&mut self, slot: &PersonSlot) -> Result<f32, PoseError> {
        if slot.len() != self.sequence_length {
            return Err(PoseError::SlotNotReady {
                len: slot.len(),
                required: self.sequence_length,
            });
        }
        let model = self
            .model
            .as_mut()
            .ok_or(PoseError::ModelUninitialized("temporal classifier"))?;

        let input = slot.as_flat();
        let outputs = model
            .run(&input)
            .map_err(|e| PoseError::InferenceFailure(format!("{:#}", e)))?;
        let score = outputs
            .first()
            .copied()
            .ok_or_else(|| PoseError::InferenceFailure("model produced no output".to_string()))?;
        if !score.is_finite() {
            return Err(PoseError::InferenceFailure(format!(
                "model produced a non-finite score ({})",
                score
            )));
        }
        Ok(score)
    }

    /// Fail-closed verdict for one slot.
    pub fn verdict(&mut self, person: PersonKey, slot: &PersonSlot) -> TemporalVerdict {
        if !slot.is_ready() {
            return TemporalVerdict {
                person,
                score: None,
                positive: false,
                ready: false,
            };
        }
        match self.evaluate(slot) {
            Ok(score) => TemporalVerdict {
                person,
                score: Some(score),
                positive: self.is_positive(score),
                ready: true,
            },
            Err(err) => {
                self.report_failure(person, &err);
                TemporalVerdict {
                    person,
                    score: None,
                    positive: false,
                    ready: true,
                }
            }
        }
    }

    /// One verdict per slot, in key order.
    pub fn evaluate_all(&mut self, buffer: &SequenceBuffer) -> Vec<TemporalVerdict> {
        buffer
            .slots()
            .map(|(person, slot)| self.verdict(person, slot))
            .collect()
    }

    fn report_failure(&mut self, person: PersonKey, err: &PoseError) {
        if let PoseError::ModelUninitialized(_) = err {
            if !self.warned_uninitialized {
                log::warn!("temporal classifier has no model; verdicts default to negative");
                self.warned_uninitialized = true;
            }
            return;
        }
        log::warn!("temporal classification failed for {}: {}", person, err);
    }
}
