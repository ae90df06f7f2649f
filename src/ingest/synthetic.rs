//! Synthetic skeleton source (`stub://`).
//!
//! Generates upright skeletons with a little landmark jitter. The scene runs
//! through a fixed schedule, one phase per `PHASE_FRAMES` frames:
//!
//! | phase | people | motion |
//! |---|---|---|
//! | 0 | 1 | calm |
//! | 1 | 2 | calm |
//! | 2 | 2 | person 0 agitated |
//! | 3 | 0 | - |
//!
//! Jitter is seeded from the source name, so a given `stub://name` always
//! replays the same frames.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::FrameInput;
use crate::landmark::{
    Keypoint, PersonFrame, LANDMARK_COUNT, LEFT_ANKLE, LEFT_ELBOW, LEFT_FOOT_INDEX, LEFT_HEEL,
    LEFT_HIP, LEFT_INDEX, LEFT_KNEE, LEFT_PINKY, LEFT_SHOULDER, LEFT_THUMB, LEFT_WRIST,
    RIGHT_ANKLE, RIGHT_ELBOW, RIGHT_FOOT_INDEX, RIGHT_HEEL, RIGHT_HIP, RIGHT_INDEX, RIGHT_KNEE,
    RIGHT_PINKY, RIGHT_SHOULDER, RIGHT_THUMB, RIGHT_WRIST,
};

use super::SourceStats;

pub const PHASE_FRAMES: u64 = 50;
const FRAME_INTERVAL_MS: i64 = 33;
const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const CALM_JITTER: f32 = 0.002;
const AGITATED_JITTER: f32 = 0.03;

pub struct SyntheticSource {
    name: String,
    frame_count: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(name: &str) -> Self {
        let seed = name
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |hash, b| {
                (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });
        log::info!("synthetic landmark source stub://{} (seed {:#x})", name, seed);
        Self {
            name: name.to_string(),
            frame_count: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_frame(&mut self) -> FrameInput {
        let index = self.frame_count;
        self.frame_count += 1;

        let phase = (index / PHASE_FRAMES) % 4;
        let people = match phase {
            0 => 1,
            1 | 2 => 2,
            _ => 0,
        };
        let persons = (0..people)
            .map(|slot| {
                let jitter = if phase == 2 && slot == 0 {
                    AGITATED_JITTER
                } else {
                    CALM_JITTER
                };
                let center = 0.3 + 0.4 * slot as f32;
                self.skeleton(center, jitter)
            })
            .collect();

        FrameInput::new(index as i64 * FRAME_INTERVAL_MS, WIDTH, HEIGHT, persons)
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            uri: format!("stub://{}", self.name),
        }
    }

    /// Upright person centered on `cx`, arms down.
    fn skeleton(&mut self, cx: f32, jitter: f32) -> PersonFrame {
        let mut keypoints = vec![Keypoint::new(cx, 0.15, 0.0); LANDMARK_COUNT];
        let body = [
            (LEFT_SHOULDER, 0.05, 0.30),
            (RIGHT_SHOULDER, -0.05, 0.30),
            (LEFT_ELBOW, 0.07, 0.42),
            (RIGHT_ELBOW, -0.07, 0.42),
            (LEFT_WRIST, 0.08, 0.54),
            (RIGHT_WRIST, -0.08, 0.54),
            (LEFT_PINKY, 0.085, 0.57),
            (RIGHT_PINKY, -0.085, 0.57),
            (LEFT_INDEX, 0.08, 0.58),
            (RIGHT_INDEX, -0.08, 0.58),
            (LEFT_THUMB, 0.075, 0.56),
            (RIGHT_THUMB, -0.075, 0.56),
            (LEFT_HIP, 0.04, 0.55),
            (RIGHT_HIP, -0.04, 0.55),
            (LEFT_KNEE, 0.04, 0.72),
            (RIGHT_KNEE, -0.04, 0.72),
            (LEFT_ANKLE, 0.04, 0.90),
            (RIGHT_ANKLE, -0.04, 0.90),
            (LEFT_HEEL, 0.035, 0.92),
            (RIGHT_HEEL, -0.035, 0.92),
            (LEFT_FOOT_INDEX, 0.05, 0.94),
            (RIGHT_FOOT_INDEX, -0.05, 0.94),
        ];
        for (index, dx, y) in body {
            keypoints[index] = Keypoint::new(cx + dx, y, 0.0);
        }
        for kp in &mut keypoints {
            kp.x += self.rng.gen_range(-jitter..=jitter);
            kp.y += self.rng.gen_range(-jitter..=jitter);
            kp.z += self.rng.gen_range(-jitter..=jitter);
            kp.presence = Some(self.rng.gen_range(0.85..=1.0));
        }
        PersonFrame::new(keypoints)
    }
}
