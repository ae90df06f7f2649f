//! JSON-lines landmark recordings.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::frame::FrameInput;
use crate::landmark::PersonFrame;

use super::SourceStats;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameRecord {
    timestamp_ms: i64,
    width: u32,
    height: u32,
    #[serde(default)]
    persons: Vec<PersonFrame>,
}

pub struct JsonlSource {
    reader: Box<dyn BufRead + Send>,
    uri: String,
    line_no: u64,
    frames_read: u64,
}

impl JsonlSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open landmark file {}", path.display()))?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }

    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()), "-".to_string())
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, uri: String) -> Self {
        Self {
            reader: Box::new(reader),
            uri,
            line_no: 0,
            frames_read: 0,
        }
    }

    /// Next frame, skipping blank lines. `None` at end of input.
    pub fn next_frame(&mut self) -> Result<Option<FrameInput>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("failed to read {}", self.uri))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: FrameRecord = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: invalid frame record", self.uri, self.line_no))?;
            self.frames_read += 1;
            return Ok(Some(FrameInput::new(
                record.timestamp_ms,
                record.width,
                record.height,
                record.persons,
            )));
        }
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            uri: self.uri.clone(),
        }
    }
}
