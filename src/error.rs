//! Error taxonomy for the classification pipeline.
//!
//! Every variant is contained to the smallest unit it concerns (one frame, one
//! person slot, one classifier call). Only resource acquisition failures are
//! escalated to the presentation side, as a `PipelineFault`.

use serde::Serialize;
use thiserror::Error;

use crate::config::Delegate;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PoseError {
    /// A person frame did not carry the canonical keypoint count.
    #[error("invalid landmark count: expected {expected}, got {actual}")]
    InvalidLandmarkCount { expected: usize, actual: usize },

    #[error("classifier input is empty")]
    EmptyInput,

    #[error("classifier input shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The backing model was never loaded (or failed to load).
    #[error("{0} model is not initialized")]
    ModelUninitialized(&'static str),

    #[error("inference failed: {0}")]
    InferenceFailure(String),

    #[error("person slot holds {len} of {required} frames")]
    SlotNotReady { len: usize, required: usize },

    #[error("label table malformed: {0}")]
    LabelTableMalformed(String),

    #[error("failed to load model from {source_uri}: {reason}")]
    ModelLoad { source_uri: String, reason: String },

    #[error("compute delegate {0:?} is not available for this backend")]
    DelegateUnavailable(Delegate),
}

impl PoseError {
    /// True for failures acquiring model resources (load or delegate selection).
    pub fn is_resource_failure(&self) -> bool {
        matches!(
            self,
            PoseError::ModelLoad { .. }
                | PoseError::DelegateUnavailable(_)
                | PoseError::LabelTableMalformed(_)
        )
    }
}

/// User-visible error signal handed to the presentation collaborator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineFault {
    pub message: String,
    /// Set when switching the compute delegate is likely to help.
    pub recommendation: Option<String>,
}

impl PipelineFault {
    pub fn from_error(err: &PoseError, delegate: Delegate) -> Self {
        let recommendation = match (err, delegate) {
            (PoseError::DelegateUnavailable(Delegate::Gpu), _)
            | (PoseError::ModelLoad { .. }, Delegate::Gpu) => {
                Some("GPU delegate failed to initialize; switch the delegate to CPU".to_string())
            }
            _ => None,
        };
        Self {
            message: err.to_string(),
            recommendation,
        }
    }
}
