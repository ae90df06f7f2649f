//! Pose landmarks and the feature normalizer.
//!
//! - `Keypoint`: one anatomical point in normalized image space.
//! - `PersonFrame`: the keypoints of one detected person in one camera frame.
//! - `FeatureVector`: the flat 99-float vector every classifier consumes.
//!
//! Upstream detectors hand us `PersonFrame`s as-is; the 33-point invariant is
//! enforced here, at normalization, and nowhere is a malformed frame buffered.

use serde::{Deserialize, Serialize};

use crate::error::PoseError;

/// Keypoints per person in the canonical pose layout.
pub const LANDMARK_COUNT: usize = 33;

/// Values per keypoint in a feature vector.
pub const VALUES_PER_LANDMARK: usize = 3;

/// Width of one frame's feature vector (33 x 3).
pub const FEATURE_WIDTH: usize = LANDMARK_COUNT * VALUES_PER_LANDMARK;

// Canonical 33-point indices.
pub const NOSE: usize = 0;
pub const LEFT_EYE_INNER: usize = 1;
pub const LEFT_EYE: usize = 2;
pub const LEFT_EYE_OUTER: usize = 3;
pub const RIGHT_EYE_INNER: usize = 4;
pub const RIGHT_EYE: usize = 5;
pub const RIGHT_EYE_OUTER: usize = 6;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const MOUTH_LEFT: usize = 9;
pub const MOUTH_RIGHT: usize = 10;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_PINKY: usize = 17;
pub const RIGHT_PINKY: usize = 18;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;
pub const LEFT_THUMB: usize = 21;
pub const RIGHT_THUMB: usize = 22;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;
pub const LEFT_HEEL: usize = 29;
pub const RIGHT_HEEL: usize = 30;
pub const LEFT_FOOT_INDEX: usize = 31;
pub const RIGHT_FOOT_INDEX: usize = 32;

/// One tracked point. Coordinates are normalized to the image (roughly 0..1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Visibility/presence score in 0..1, when the detector reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<f32>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            presence: None,
        }
    }

    pub fn with_presence(mut self, presence: f32) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// Keypoints for one detected person, in landmark order.
///
/// Not validated on construction: detectors may deliver short or long lists,
/// and those must be surfaced as `InvalidLandmarkCount` rather than dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonFrame {
    keypoints: Vec<Keypoint>,
}

impl PersonFrame {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Fixed-size view of the keypoints, or `InvalidLandmarkCount`.
    pub fn landmarks(&self) -> Result<&[Keypoint; LANDMARK_COUNT], PoseError> {
        self.keypoints
            .as_slice()
            .try_into()
            .map_err(|_| PoseError::InvalidLandmarkCount {
                expected: LANDMARK_COUNT,
                actual: self.keypoints.len(),
            })
    }
}

impl From<Vec<Keypoint>> for PersonFrame {
    fn from(keypoints: Vec<Keypoint>) -> Self {
        Self::new(keypoints)
    }
}

/// Which third value a classifier expects per keypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    #[default]
    Xyz,
    XyPresence,
}

impl std::str::FromStr for FeatureLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xyz" => Ok(FeatureLayout::Xyz),
            "xy_presence" | "xypresence" => Ok(FeatureLayout::XyPresence),
            other => Err(anyhow::anyhow!("unknown feature layout '{}'", other)),
        }
    }
}

/// Flat feature vector: `[v0.x, v0.y, v0.third, v1.x, ...]`, always 99 values.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector([f32; FEATURE_WIDTH]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Values for keypoint `index`.
    pub fn triplet(&self, index: usize) -> &[f32] {
        let start = index * VALUES_PER_LANDMARK;
        &self.0[start..start + VALUES_PER_LANDMARK]
    }
}

impl From<[f32; FEATURE_WIDTH]> for FeatureVector {
    fn from(values: [f32; FEATURE_WIDTH]) -> Self {
        Self(values)
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Flatten a person frame into a feature vector. No smoothing, no filtering.
pub fn normalize(frame: &PersonFrame, layout: FeatureLayout) -> Result<FeatureVector, PoseError> {
    let landmarks = frame.landmarks()?;
    let mut values = [0.0f32; FEATURE_WIDTH];
    for (chunk, kp) in values
        .chunks_exact_mut(VALUES_PER_LANDMARK)
        .zip(landmarks.iter())
    {
        let third = match layout {
            FeatureLayout::Xyz => kp.z,
            FeatureLayout::XyPresence => kp.presence.unwrap_or(0.0),
        };
        chunk.copy_from_slice(&[kp.x, kp.y, third]);
    }
    Ok(FeatureVector(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(count: usize) -> PersonFrame {
        (0..count)
            .map(|i| Keypoint::new(i as f32 * 0.01, i as f32 * 0.02, -(i as f32)))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn normalize_rejects_wrong_landmark_counts() {
        for count in [0, 1, 32, 34, 66] {
            let err = normalize(&make_frame(count), FeatureLayout::Xyz).unwrap_err();
            assert_eq!(
                err,
                PoseError::InvalidLandmarkCount {
                    expected: 33,
                    actual: count
                }
            );
        }
    }

    #[test]
    fn normalize_flattens_in_landmark_order() {
        let frame = make_frame(LANDMARK_COUNT);
        let features = normalize(&frame, FeatureLayout::Xyz).unwrap();

        assert_eq!(features.as_slice().len(), FEATURE_WIDTH);
        for (i, kp) in frame.keypoints().iter().enumerate() {
            assert_eq!(features.triplet(i), &[kp.x, kp.y, kp.z]);
        }
    }

    #[test]
    fn presence_layout_defaults_missing_scores_to_zero() {
        let mut keypoints: Vec<Keypoint> = make_frame(LANDMARK_COUNT).keypoints().to_vec();
        keypoints[NOSE] = keypoints[NOSE].with_presence(0.75);
        let features = normalize(&PersonFrame::new(keypoints), FeatureLayout::XyPresence).unwrap();

        assert_eq!(features.triplet(NOSE)[2], 0.75);
        assert_eq!(features.triplet(RIGHT_FOOT_INDEX)[2], 0.0);
    }

    #[test]
    fn keypoints_deserialize_without_optional_fields() {
        let kp: Keypoint = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(kp, Keypoint::new(0.5, 0.25, 0.0));
        assert!(serde_json::from_str::<Keypoint>(r#"{"x":0,"y":0,"w":1}"#).is_err());
    }
}
