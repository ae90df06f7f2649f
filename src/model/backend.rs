use anyhow::{anyhow, Result};

use crate::landmark::FEATURE_WIDTH;

/// Fixed tensor layout a model was exported with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelShape {
    /// One frame in, a distribution over `outputs` labels out: `[1, features] -> [1, outputs]`.
    Frame { features: usize, outputs: usize },
    /// A window of frames in: `[1, frames, features] -> [1, outputs]`.
    Sequence {
        frames: usize,
        features: usize,
        outputs: usize,
    },
}

impl ModelShape {
    /// Static pose classifier over one 99-value feature vector.
    pub fn per_frame(outputs: usize) -> Self {
        ModelShape::Frame {
            features: FEATURE_WIDTH,
            outputs,
        }
    }

    /// Temporal classifier over `frames` feature vectors with one scalar output.
    pub fn sequence(frames: usize) -> Self {
        ModelShape::Sequence {
            frames,
            features: FEATURE_WIDTH,
            outputs: 1,
        }
    }

    /// Flat input length the model consumes.
    pub fn input_len(&self) -> usize {
        match *self {
            ModelShape::Frame { features, .. } => features,
            ModelShape::Sequence {
                frames, features, ..
            } => frames * features,
        }
    }

    pub fn output_len(&self) -> usize {
        match *self {
            ModelShape::Frame { outputs, .. } | ModelShape::Sequence { outputs, .. } => outputs,
        }
    }

    /// Fail unless `outputs` has exactly `output_len()` values.
    pub fn check_output(&self, outputs: &[f32]) -> Result<()> {
        if outputs.len() != self.output_len() {
            return Err(anyhow!(
                "model declared {} output values, produced {}",
                self.output_len(),
                outputs.len()
            ));
        }
        Ok(())
    }

    /// Tensor dimensions including the batch axis.
    pub fn input_dims(&self) -> Vec<usize> {
        match *self {
            ModelShape::Frame { features, .. } => vec![1, features],
            ModelShape::Sequence {
                frames, features, ..
            } => vec![1, frames, features],
        }
    }
}

/// A loaded model that maps one flat `f32` buffer to one flat `f32` output.
///
/// Implementations own their runtime state and are driven from a single
/// worker thread; they are `Send` so the worker can take ownership, never
/// shared. Dropping a backend releases its resources.
pub trait ModelBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Shape the model was loaded with.
    fn shape(&self) -> ModelShape;

    /// Run one forward pass. `input.len()` equals `shape().input_len()`.
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
