//! Upstream frame delivery.
//!
//! A `FrameInput` is one inference cycle's worth of input from the camera or
//! media collaborator: the frame timestamp, the native image size, and zero or
//! more detected people. It is the only thing the pipeline accepts from
//! upstream; live-stream callbacks and batch (file) readers both build it.

use std::time::Instant;

use crate::landmark::PersonFrame;

#[derive(Clone, Debug)]
pub struct FrameInput {
    /// Upstream frame timestamp in milliseconds (monotonic per source).
    pub timestamp_ms: i64,
    pub width: u32,
    pub height: u32,
    /// Detected people, in detector order.
    pub persons: Vec<PersonFrame>,
    /// When the frame reached the pipeline. Latency is measured from here.
    received_at: Instant,
}

impl FrameInput {
    pub fn new(timestamp_ms: i64, width: u32, height: u32, persons: Vec<PersonFrame>) -> Self {
        Self {
            timestamp_ms,
            width,
            height,
            persons,
            received_at: Instant::now(),
        }
    }

    /// A frame with nobody in it.
    pub fn empty(timestamp_ms: i64, width: u32, height: u32) -> Self {
        Self::new(timestamp_ms, width, height, Vec::new())
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }
}
