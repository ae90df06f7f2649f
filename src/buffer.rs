//! Multi-person sequence buffer.
//!
//! Each tracked person owns a `PersonSlot`: a bounded FIFO of the last N
//! feature vectors, oldest first. Per inference cycle the buffer:
//!
//! 1. Appends every present person's vector to its slot, creating the slot on
//!    first sight and evicting the oldest entry past capacity.
//! 2. Deletes every slot whose person was not present this cycle. There is no
//!    grace period; a person who comes back starts from an empty window.
//!
//! Person identity comes from an `IdentityAssigner`. The default assigns the
//! detection index, so identities follow detector order and are reassigned if
//! that order changes between frames. A tracker can replace it without
//! touching the buffer or the classifiers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::landmark::{FeatureVector, PersonFrame, FEATURE_WIDTH};

/// Identity of one person slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PersonKey(pub u32);

impl std::fmt::Display for PersonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "person#{}", self.0)
    }
}

/// Maps this cycle's detections to person keys, one key per detection.
pub trait IdentityAssigner: Send {
    fn assign(&mut self, persons: &[PersonFrame]) -> Vec<PersonKey>;
}

/// Detection index as identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionalIdentity;

impl IdentityAssigner for PositionalIdentity {
    fn assign(&mut self, persons: &[PersonFrame]) -> Vec<PersonKey> {
        (0..persons.len()).map(|i| PersonKey(i as u32)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Holds fewer than N frames.
    Filling(usize),
    /// Holds exactly N frames; eligible for temporal classification.
    Ready,
}

/// Bounded window of one person's recent feature vectors.
#[derive(Clone, Debug)]
pub struct PersonSlot {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl PersonSlot {
    fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest past capacity. Returns true on eviction.
    fn push(&mut self, features: FeatureVector) -> bool {
        self.frames.push_back(features);
        if self.frames.len() > self.capacity {
            self.frames.pop_front();
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> SlotState {
        if self.frames.len() >= self.capacity {
            SlotState::Ready
        } else {
            SlotState::Filling(self.frames.len())
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SlotState::Ready
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames in chronological order, oldest first.
    pub fn frames(&self) -> impl Iterator<Item = &FeatureVector> {
        self.frames.iter()
    }

    pub fn oldest(&self) -> Option<&FeatureVector> {
        self.frames.front()
    }

    pub fn latest(&self) -> Option<&FeatureVector> {
        self.frames.back()
    }

    /// Window flattened oldest first: `len() * 99` values.
    pub fn as_flat(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.frames.len() * FEATURE_WIDTH);
        for frame in &self.frames {
            flat.extend_from_slice(frame.as_slice());
        }
        flat
    }
}

/// Slot lifecycle changes from one cycle, for logging and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub created: Vec<PersonKey>,
    /// Slots that reached N frames for the first time this cycle.
    pub became_ready: Vec<PersonKey>,
    /// Slots deleted because their person was absent.
    pub removed: Vec<PersonKey>,
}

/// Owner of every person slot.
pub struct SequenceBuffer {
    capacity: usize,
    slots: BTreeMap<PersonKey, PersonSlot>,
}

impl SequenceBuffer {
    /// Buffer with windows of `capacity` frames. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: BTreeMap::new(),
        }
    }

    /// Apply one cycle's observations.
    ///
    /// Every person detected this cycle must appear exactly once. A `None`
    /// vector marks a person whose frame was rejected: the slot survives the
    /// cycle but nothing is appended.
    pub fn record_cycle<I>(&mut self, observations: I) -> CycleReport
    where
        I: IntoIterator<Item = (PersonKey, Option<FeatureVector>)>,
    {
        let mut report = CycleReport::default();
        let mut present = BTreeSet::new();

        for (key, features) in observations {
            present.insert(key);
            let Some(features) = features else {
                continue;
            };
            let capacity = self.capacity;
            let slot = self.slots.entry(key).or_insert_with(|| {
                report.created.push(key);
                PersonSlot::new(capacity)
            });
            let was_ready = slot.is_ready();
            slot.push(features);
            if !was_ready && slot.is_ready() {
                report.became_ready.push(key);
            }
        }

        self.slots.retain(|key, _| {
            let keep = present.contains(key);
            if !keep {
                report.removed.push(*key);
            }
            keep
        });

        report
    }

    pub fn get(&self, key: PersonKey) -> Option<&PersonSlot> {
        self.slots.get(&key)
    }

    pub fn contains(&self, key: PersonKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Slots in key order.
    pub fn slots(&self) -> impl Iterator<Item = (PersonKey, &PersonSlot)> {
        self.slots.iter().map(|(key, slot)| (*key, slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
