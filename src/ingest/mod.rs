//! Landmark ingestion sources.
//!
//! The pipeline consumes detector output, not pixels. Two sources produce
//! `FrameInput`s for the binaries:
//! - `stub://<name>`: synthetic skeletons for demos and tests. People come and
//!   go every few seconds and one of them periodically thrashes about.
//! - A local JSON-lines file (or `-` for stdin), one frame per line:
//!
//! ```text
//! {"timestamp_ms": 0, "width": 640, "height": 480, "persons": [[{"x": 0.5, "y": 0.2, "z": 0.0}, ...]]}
//! ```
//!
//! Only local paths are accepted; there is no network ingestion.

pub mod jsonl;
pub mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::FrameInput;

pub use jsonl::JsonlSource;
pub use synthetic::SyntheticSource;

const STUB_SCHEME: &str = "stub://";

/// A source of detector output.
pub struct LandmarkSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    Jsonl(JsonlSource),
}

impl LandmarkSource {
    pub fn open(uri: &str) -> Result<Self> {
        if let Some(name) = uri.strip_prefix(STUB_SCHEME) {
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::new(name)),
            });
        }
        if uri.contains("://") {
            return Err(anyhow!(
                "landmark ingestion only supports local paths and stub:// (got {})",
                uri
            ));
        }
        let source = if uri == "-" {
            JsonlSource::stdin()
        } else {
            JsonlSource::open(uri)?
        };
        Ok(Self {
            backend: SourceBackend::Jsonl(source),
        })
    }

    /// Next frame, or `None` once a finite source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<FrameInput>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => Ok(Some(source.next_frame())),
            SourceBackend::Jsonl(source) => source.next_frame(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            SourceBackend::Jsonl(source) => source.stats(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub uri: String,
}
