//! Deterministic geometric pose rules.
//!
//! These run on a single person's landmarks with no learned state. Screen
//! space has y growing downward, so "above" means a smaller y.

use serde::Serialize;

use crate::landmark::{
    Keypoint, LANDMARK_COUNT, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST,
    RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};

/// Alignment and proximity tolerance in normalized image units.
pub const ALIGNMENT_THRESHOLD: f32 = 0.1;

/// Knee angle (degrees) below which a leg counts as bent for a squat.
pub const SQUAT_KNEE_ANGLE: f32 = 100.0;

type Landmarks = [Keypoint; LANDMARK_COUNT];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum RulePose {
    Plank,
    Tree,
    RightHandRaised,
    Squat,
    #[default]
    Unknown,
}

impl RulePose {
    pub fn label(&self) -> &'static str {
        match self {
            RulePose::Plank => "Plank Pose",
            RulePose::Tree => "Tree Pose",
            RulePose::RightHandRaised => "Right Hand Raised",
            RulePose::Squat => "Squat Pose",
            RulePose::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for RulePose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Combine every rule into one label. First match wins, in this fixed order:
/// Plank, Tree, RightHandRaised, Squat. The order is part of the output
/// contract and must not be reshuffled.
pub fn evaluate(landmarks: &Landmarks) -> RulePose {
    if is_plank(landmarks) {
        RulePose::Plank
    } else if is_tree_pose(landmarks) {
        RulePose::Tree
    } else if is_right_hand_raised(landmarks) {
        RulePose::RightHandRaised
    } else if is_squat(landmarks) {
        RulePose::Squat
    } else {
        RulePose::Unknown
    }
}

pub fn is_right_hand_raised(landmarks: &Landmarks) -> bool {
    landmarks[RIGHT_WRIST].y < landmarks[RIGHT_SHOULDER].y
}

/// Shoulders level with hips and hips level with ankles.
pub fn is_plank(landmarks: &Landmarks) -> bool {
    let torso = (landmarks[LEFT_SHOULDER].y - landmarks[LEFT_HIP].y).abs()
        + (landmarks[RIGHT_SHOULDER].y - landmarks[RIGHT_HIP].y).abs();
    let legs = (landmarks[LEFT_HIP].y - landmarks[LEFT_ANKLE].y).abs()
        + (landmarks[RIGHT_HIP].y - landmarks[RIGHT_ANKLE].y).abs();
    torso < ALIGNMENT_THRESHOLD && legs < ALIGNMENT_THRESHOLD
}

/// Both wrists up, and one ankle resting against the opposite knee.
pub fn is_tree_pose(landmarks: &Landmarks) -> bool {
    let arms_up = landmarks[LEFT_WRIST].y < landmarks[LEFT_SHOULDER].y
        && landmarks[RIGHT_WRIST].y < landmarks[RIGHT_SHOULDER].y;
    let left_foot_on_knee = near(&landmarks[LEFT_ANKLE], &landmarks[RIGHT_KNEE]);
    let right_foot_on_knee = near(&landmarks[RIGHT_ANKLE], &landmarks[LEFT_KNEE]);
    arms_up && (left_foot_on_knee || right_foot_on_knee)
}

/// Both knees bent past the squat angle, hips dropped below knees, feet level.
pub fn is_squat(landmarks: &Landmarks) -> bool {
    let left_knee = calculate_angle(
        point(&landmarks[LEFT_HIP]),
        point(&landmarks[LEFT_KNEE]),
        point(&landmarks[LEFT_ANKLE]),
    );
    let right_knee = calculate_angle(
        point(&landmarks[RIGHT_HIP]),
        point(&landmarks[RIGHT_KNEE]),
        point(&landmarks[RIGHT_ANKLE]),
    );
    let knees_bent = left_knee < SQUAT_KNEE_ANGLE && right_knee < SQUAT_KNEE_ANGLE;
    let hips_low = landmarks[LEFT_HIP].y > landmarks[LEFT_KNEE].y
        && landmarks[RIGHT_HIP].y > landmarks[RIGHT_KNEE].y;
    let feet_level =
        (landmarks[LEFT_ANKLE].y - landmarks[RIGHT_ANKLE].y).abs() < ALIGNMENT_THRESHOLD;
    knees_bent && hips_low && feet_level
}

/// Angle at `b` between `b->a` and `b->c`, in degrees within `0..=180`.
///
/// Uses the difference of the two `atan2` headings, so the result is exactly
/// 180 for collinear points with `b` in the middle.
pub fn calculate_angle(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let radians = (c.1 - b.1).atan2(c.0 - b.0) - (a.1 - b.1).atan2(a.0 - b.0);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

fn near(a: &Keypoint, b: &Keypoint) -> bool {
    (a.x - b.x).abs() < ALIGNMENT_THRESHOLD && (a.y - b.y).abs() < ALIGNMENT_THRESHOLD
}

fn point(kp: &Keypoint) -> (f32, f32) {
    (kp.x, kp.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(landmarks: &mut Landmarks, index: usize, x: f32, y: f32) {
        landmarks[index] = Keypoint::new(x, y, 0.0);
    }

    /// Upright person, arms down, legs straight.
    fn standing() -> Landmarks {
        let mut lm = [Keypoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        set(&mut lm, LEFT_SHOULDER, 0.55, 0.30);
        set(&mut lm, RIGHT_SHOULDER, 0.45, 0.30);
        set(&mut lm, LEFT_WRIST, 0.58, 0.55);
        set(&mut lm, RIGHT_WRIST, 0.42, 0.55);
        set(&mut lm, LEFT_HIP, 0.54, 0.55);
        set(&mut lm, RIGHT_HIP, 0.46, 0.55);
        set(&mut lm, LEFT_KNEE, 0.54, 0.72);
        set(&mut lm, RIGHT_KNEE, 0.46, 0.72);
        set(&mut lm, LEFT_ANKLE, 0.54, 0.90);
        set(&mut lm, RIGHT_ANKLE, 0.46, 0.90);
        lm
    }

    #[test]
    fn angle_of_collinear_points_is_straight() {
        assert!((calculate_angle((0.0, 0.0), (0.5, 0.0), (1.0, 0.0)) - 180.0).abs() < 1e-4);
        assert!((calculate_angle((0.2, 0.1), (0.2, 0.5), (0.2, 0.9)) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn angle_of_perpendicular_vectors_is_right() {
        assert!((calculate_angle((0.0, 1.0), (0.0, 0.0), (1.0, 0.0)) - 90.0).abs() < 1e-4);
        assert!((calculate_angle((1.0, 0.0), (0.0, 0.0), (0.0, 1.0)) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn reflex_angles_fold_into_half_turn() {
        // 270 degrees one way round is 90 the other way.
        let angle = calculate_angle((0.0, -1.0), (0.0, 0.0), (-1.0, 0.0));
        assert!((angle - 90.0).abs() < 1e-4, "angle {angle}");
    }

    #[test]
    fn standing_person_matches_no_rule() {
        assert_eq!(evaluate(&standing()), RulePose::Unknown);
    }

    #[test]
    fn raised_right_wrist_is_detected() {
        let mut lm = standing();
        set(&mut lm, RIGHT_WRIST, 0.42, 0.10);
        assert!(is_right_hand_raised(&lm));
        assert_eq!(evaluate(&lm), RulePose::RightHandRaised);
    }

    #[test]
    fn tree_pose_needs_both_arms_and_a_foot_on_a_knee() {
        let mut lm = standing();
        set(&mut lm, LEFT_WRIST, 0.52, 0.10);
        set(&mut lm, RIGHT_WRIST, 0.48, 0.10);
        assert!(!is_tree_pose(&lm));

        set(&mut lm, RIGHT_ANKLE, 0.52, 0.70);
        assert!(is_tree_pose(&lm));
        assert_eq!(evaluate(&lm), RulePose::Tree);

        set(&mut lm, LEFT_WRIST, 0.58, 0.55);
        assert!(!is_tree_pose(&lm));
        // Right wrist is still up.
        assert_eq!(evaluate(&lm), RulePose::RightHandRaised);
    }

    #[test]
    fn squat_requires_bent_knees_low_hips_and_level_feet() {
        let mut lm = standing();
        set(&mut lm, LEFT_HIP, 0.40, 0.75);
        set(&mut lm, RIGHT_HIP, 0.60, 0.75);
        set(&mut lm, LEFT_KNEE, 0.30, 0.70);
        set(&mut lm, RIGHT_KNEE, 0.70, 0.70);
        set(&mut lm, LEFT_ANKLE, 0.32, 0.90);
        set(&mut lm, RIGHT_ANKLE, 0.68, 0.90);
        assert!(is_squat(&lm));
        assert_eq!(evaluate(&lm), RulePose::Squat);

        set(&mut lm, RIGHT_ANKLE, 0.68, 0.75);
        assert!(!is_squat(&lm));
    }

    #[test]
    fn plank_takes_precedence_over_tree_pose() {
        let mut lm = [Keypoint::new(0.5, 0.6, 0.0); LANDMARK_COUNT];
        set(&mut lm, LEFT_SHOULDER, 0.20, 0.60);
        set(&mut lm, RIGHT_SHOULDER, 0.22, 0.60);
        set(&mut lm, LEFT_HIP, 0.50, 0.61);
        set(&mut lm, RIGHT_HIP, 0.52, 0.61);
        set(&mut lm, LEFT_KNEE, 0.65, 0.62);
        set(&mut lm, RIGHT_KNEE, 0.67, 0.62);
        set(&mut lm, LEFT_ANKLE, 0.68, 0.62);
        set(&mut lm, RIGHT_ANKLE, 0.80, 0.62);
        set(&mut lm, LEFT_WRIST, 0.20, 0.50);
        set(&mut lm, RIGHT_WRIST, 0.22, 0.50);

        assert!(is_plank(&lm));
        assert!(is_tree_pose(&lm));
        assert_eq!(evaluate(&lm), RulePose::Plank);
        assert_eq!(evaluate(&lm).label(), "Plank Pose");
    }
}
