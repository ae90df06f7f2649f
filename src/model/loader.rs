use std::path::Path;

use crate::config::Delegate;
use crate::error::PoseError;

use super::backend::{ModelBackend, ModelShape};
use super::backends::{StubMode, StubModel};

const STUB_SCHEME: &str = "stub://";

/// Load a model from `source` for the requested compute delegate.
///
/// `stub://zero` and `stub://motion` build deterministic stub backends. Any
/// other source is a local ONNX path, which needs the `backend-tract` feature
/// and only runs on the CPU delegate.
pub fn load_model(
    source: &str,
    delegate: Delegate,
    shape: ModelShape,
) -> Result<Box<dyn ModelBackend>, PoseError> {
    let mut backend = open_backend(source, delegate, shape)?;
    backend.warm_up().map_err(|e| PoseError::ModelLoad {
        source_uri: source.to_string(),
        reason: format!("warm-up failed: {:#}", e),
    })?;
    log::info!(
        "model loaded: source={} backend={} delegate={:?} input={} output={}",
        source,
        backend.name(),
        delegate,
        shape.input_len(),
        shape.output_len()
    );
    Ok(backend)
}

fn open_backend(
    source: &str,
    delegate: Delegate,
    shape: ModelShape,
) -> Result<Box<dyn ModelBackend>, PoseError> {
    if let Some(name) = source.strip_prefix(STUB_SCHEME) {
        let mode = match name {
            "" | "zero" => StubMode::Zero,
            "motion" => StubMode::Motion,
            other => {
                return Err(PoseError::ModelLoad {
                    source_uri: source.to_string(),
                    reason: format!("unknown stub model '{}'", other),
                })
            }
        };
        return Ok(Box::new(StubModel::new(shape, mode)));
    }

    if source.contains("://") {
        return Err(PoseError::ModelLoad {
            source_uri: source.to_string(),
            reason: "models are loaded from local paths only".to_string(),
        });
    }
    let path = Path::new(source);
    if !path.is_file() {
        return Err(PoseError::ModelLoad {
            source_uri: source.to_string(),
            reason: "model file not found".to_string(),
        });
    }

    open_onnx(path, delegate, shape)
}

#[cfg(feature = "backend-tract")]
fn open_onnx(
    path: &Path,
    delegate: Delegate,
    shape: ModelShape,
) -> Result<Box<dyn ModelBackend>, PoseError> {
    if delegate != Delegate::Cpu {
        return Err(PoseError::DelegateUnavailable(delegate));
    }
    let model = super::backends::TractModel::load(path, shape).map_err(|e| PoseError::ModelLoad {
        source_uri: path.display().to_string(),
        reason: format!("{:#}", e),
    })?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "backend-tract"))]
fn open_onnx(
    path: &Path,
    _delegate: Delegate,
    _shape: ModelShape,
) -> Result<Box<dyn ModelBackend>, PoseError> {
    Err(PoseError::ModelLoad {
        source_uri: path.display().to_string(),
        reason: "ONNX models require the backend-tract feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_sources_load_for_any_delegate() {
        for delegate in [Delegate::Cpu, Delegate::Gpu] {
            let model = load_model("stub://motion", delegate, ModelShape::sequence(10)).unwrap();
            assert_eq!(model.name(), "stub");
            assert_eq!(model.shape().input_len(), 990);
        }
    }

    #[test]
    fn unknown_sources_fail_to_load() {
        let shape = ModelShape::per_frame(3);
        let err = load_model("stub://nope", Delegate::Cpu, shape).err().unwrap();
        assert!(matches!(err, PoseError::ModelLoad { .. }));

        let err = load_model("https://example.com/model.onnx", Delegate::Cpu, shape)
            .err()
            .unwrap();
        assert!(err.to_string().contains("local paths"));

        let err = load_model("/definitely/missing.onnx", Delegate::Cpu, shape)
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
        assert!(err.is_resource_failure());
    }
}
