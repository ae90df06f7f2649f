use anyhow::{anyhow, Result};

use crate::model::backend::{ModelBackend, ModelShape};

/// Gain applied to mean frame-to-frame displacement in motion mode.
const MOTION_GAIN: f32 = 25.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubMode {
    /// Always outputs zeros.
    Zero,
    /// Scores a window by how much the landmarks move between frames.
    Motion,
}

/// Stub backend for demos and tests. Deterministic, no model file.
pub struct StubModel {
    shape: ModelShape,
    mode: StubMode,
}

impl StubModel {
    pub fn new(shape: ModelShape, mode: StubMode) -> Self {
        Self { shape, mode }
    }

    pub fn zero(shape: ModelShape) -> Self {
        Self::new(shape, StubMode::Zero)
    }

    pub fn motion(shape: ModelShape) -> Self {
        Self::new(shape, StubMode::Motion)
    }

    fn motion_score(&self, input: &[f32]) -> f32 {
        let ModelShape::Sequence {
            frames, features, ..
        } = self.shape
        else {
            return 0.0;
        };
        if frames < 2 {
            return 0.0;
        }
        let total: f32 = input
            .chunks_exact(features)
            .zip(input.chunks_exact(features).skip(1))
            .map(|(prev, next)| {
                prev.iter()
                    .zip(next)
                    .map(|(a, b)| (a - b).abs())
                    .sum::<f32>()
                    / features as f32
            })
            .sum();
        (total / (frames - 1) as f32 * MOTION_GAIN).min(1.0)
    }
}

impl ModelBackend for StubModel {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn shape(&self) -> ModelShape {
        self.shape
    }

    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.shape.input_len() {
            return Err(anyhow!(
                "stub expected {} input values, received {}",
                self.shape.input_len(),
                input.len()
            ));
        }
        let value = match self.mode {
            StubMode::Zero => 0.0,
            StubMode::Motion => self.motion_score(input),
        };
        Ok(vec![value; self.shape.output_len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stub_outputs_declared_width() {
        let mut model = StubModel::zero(ModelShape::per_frame(4));
        assert_eq!(model.run(&[0.5; 99]).unwrap(), vec![0.0; 4]);
        assert!(model.run(&[0.5; 98]).is_err());
    }

    #[test]
    fn motion_stub_scores_still_and_moving_windows() {
        let mut model = StubModel::motion(ModelShape::sequence(3));

        let still = vec![0.5; 3 * 99];
        assert_eq!(model.run(&still).unwrap(), vec![0.0]);

        let mut moving = vec![0.0; 3 * 99];
        for (i, value) in moving.iter_mut().enumerate() {
            *value = (i / 99) as f32 * 0.1;
        }
        let score = model.run(&moving).unwrap()[0];
        assert!(score > 0.3, "score {score}");
        assert!(score <= 1.0);
    }
}
