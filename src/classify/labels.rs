//! Ordinal to label table for the per-frame classifier.
//!
//! The resource is plain `key=value` text, one entry per line:
//!
//! ```text
//! # comments and blank lines are ignored
//! 0=Standing
//! 1=Sitting
//! ```
//!
//! Keys must be non-negative integers covering `0..n` exactly once. Anything
//! else fails at load with `LabelTableMalformed`; lookups never fall back to a
//! placeholder label at classification time.

use std::path::Path;

use crate::error::PoseError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Read and validate a label table file.
    pub fn load(path: &Path) -> Result<Self, PoseError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PoseError::LabelTableMalformed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, PoseError> {
        let mut entries: Vec<(usize, String)> = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                PoseError::LabelTableMalformed(format!("line {}: expected key=value", line_no + 1))
            })?;
            let ordinal: usize = key.trim().parse().map_err(|_| {
                PoseError::LabelTableMalformed(format!(
                    "line {}: key '{}' is not an ordinal",
                    line_no + 1,
                    key.trim()
                ))
            })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(PoseError::LabelTableMalformed(format!(
                    "line {}: label for ordinal {} is empty",
                    line_no + 1,
                    ordinal
                )));
            }
            entries.push((ordinal, value.to_string()));
        }
        Self::from_entries(entries)
    }

    /// Build from `(ordinal, label)` pairs in any order.
    pub fn from_entries(mut entries: Vec<(usize, String)>) -> Result<Self, PoseError> {
        if entries.is_empty() {
            return Err(PoseError::LabelTableMalformed(
                "table has no entries".to_string(),
            ));
        }
        entries.sort_by_key(|(ordinal, _)| *ordinal);
        let mut labels = Vec::with_capacity(entries.len());
        for (expected, (ordinal, label)) in entries.into_iter().enumerate() {
            if ordinal < expected {
                return Err(PoseError::LabelTableMalformed(format!(
                    "ordinal {} appears more than once",
                    ordinal
                )));
            }
            if ordinal > expected {
                return Err(PoseError::LabelTableMalformed(format!(
                    "ordinals are not contiguous: missing {}",
                    expected
                )));
            }
            labels.push(label);
        }
        Ok(Self { labels })
    }

    pub fn get(&self, ordinal: usize) -> Option<&str> {
        self.labels.get(ordinal).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
