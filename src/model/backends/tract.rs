#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::model::backend::{ModelBackend, ModelShape};

/// Tract-based backend for ONNX inference on the CPU.
///
/// The model is loaded once from a local file with its input fact pinned to
/// the declared shape, optimized, and kept as a runnable plan.
pub struct TractModel {
    plan: TypedRunnableModel<TypedModel>,
    shape: ModelShape,
}

impl TractModel {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P, shape: ModelShape) -> Result<Self> {
        let model_path = model_path.as_ref();
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), shape.input_dims()),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { plan, shape })
    }

    fn build_input(&self, input: &[f32]) -> Result<Tensor> {
        if input.len() != self.shape.input_len() {
            return Err(anyhow!(
                "expected {} input values, received {}",
                self.shape.input_len(),
                input.len()
            ));
        }
        Tensor::from_shape(&self.shape.input_dims(), input).context("failed to build input tensor")
    }
}

impl ModelBackend for TractModel {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn shape(&self) -> ModelShape {
        self.shape
    }

    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let input = self.build_input(input)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        Ok(values.iter().copied().collect())
    }

    fn warm_up(&mut self) -> Result<()> {
        let zeros = vec![0.0f32; self.shape.input_len()];
        let outputs = self.run(&zeros)?;
        self.shape.check_output(&outputs)
    }
}
