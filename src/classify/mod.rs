//! Per-frame classification.
//!
//! Two independent paths run over a single frame:
//! - `pose`: the learned classifier, driven by a model backend and a label table.
//! - `rules`: deterministic geometric heuristics over raw landmarks.

pub mod labels;
pub mod pose;
pub mod rules;

pub use labels::LabelTable;
pub use pose::{PoseClassifier, CLASSIFICATION_FAILED, MODEL_UNAVAILABLE, NOT_RECOGNIZED};
pub use rules::{calculate_angle, RulePose};
