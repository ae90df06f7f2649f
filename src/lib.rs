//! Pose Kernel
//!
//! Temporal pose-sequence buffering and activity classification over the
//! output of an upstream pose-landmark detector.
//!
//! # Pipeline
//!
//! Every upstream frame runs one inference cycle:
//!
//! 1. **Normalize**: each detected person's 33 keypoints become a 99-value
//!    feature vector. Frames with the wrong keypoint count are rejected and
//!    reported, never padded.
//! 2. **Per-frame classification**: a learned classifier labels every person;
//!    geometric rules label the first detected person.
//! 3. **Buffer**: each person's vectors accumulate in a window of the last N
//!    frames. Windows of people who left the frame are dropped immediately.
//! 4. **Temporal classification**: every full window gets one forward pass of
//!    the sequence model; a score strictly above the threshold is positive.
//! 5. **Aggregate**: the frame is positive when any person is.
//!
//! # Module Structure
//!
//! - `landmark`, `frame`: upstream data model and the normalizer
//! - `classify`: label table, learned classifier, geometric rules
//! - `buffer`, `temporal`, `aggregate`: the temporal path
//! - `model`: inference backends (stub, tract-onnx)
//! - `session`, `worker`: one configured pipeline and the thread that drives it
//! - `config`, `ingest`, `ui`: plumbing for the binaries

pub mod aggregate;
pub mod buffer;
pub mod classify;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod landmark;
pub mod model;
pub mod session;
pub mod temporal;
pub mod ui;
pub mod worker;

pub use aggregate::{aggregate, AggregateInput, ClassificationResult, FrameLabel, RejectedFrame};
pub use buffer::{
    CycleReport, IdentityAssigner, PersonKey, PersonSlot, PositionalIdentity, SequenceBuffer,
    SlotState,
};
pub use classify::{LabelTable, PoseClassifier, RulePose};
pub use config::{
    Delegate, DetectorSettings, ModelSettings, ModelVariant, PipelineConfig, SourceSettings,
};
pub use error::{PipelineFault, PoseError};
pub use frame::FrameInput;
pub use ingest::LandmarkSource;
pub use landmark::{
    normalize, FeatureLayout, FeatureVector, Keypoint, PersonFrame, FEATURE_WIDTH, LANDMARK_COUNT,
};
pub use model::{load_model, ModelBackend, ModelShape};
pub use session::Session;
pub use temporal::{TemporalClassifier, TemporalVerdict};
pub use worker::{PipelineEvent, PipelineWorker};
