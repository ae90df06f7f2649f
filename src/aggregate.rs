//! Per-frame result aggregation.
//!
//! Merges the rule verdict, per-person labels and per-slot temporal verdicts
//! into one `ClassificationResult`. Pure apart from reading the clock for the
//! latency figure.

use std::time::Instant;

use serde::Serialize;

use crate::buffer::PersonKey;
use crate::classify::RulePose;
use crate::temporal::TemporalVerdict;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameLabel {
    pub person: PersonKey,
    pub label: String,
}

/// A person frame that failed validation this cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedFrame {
    pub person: PersonKey,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub timestamp_ms: i64,
    pub image_width: u32,
    pub image_height: u32,
    /// Upstream receipt to end of aggregation.
    pub inference_time_ms: u64,
    /// Rule verdict for the first detected person only.
    pub rule_pose: RulePose,
    pub frame_labels: Vec<FrameLabel>,
    pub temporal_verdicts: Vec<TemporalVerdict>,
    /// True when any person's temporal verdict is positive.
    pub positive: bool,
    pub rejected: Vec<RejectedFrame>,
}

impl ClassificationResult {
    pub fn positive_persons(&self) -> impl Iterator<Item = PersonKey> + '_ {
        self.temporal_verdicts
            .iter()
            .filter(|v| v.positive)
            .map(|v| v.person)
    }
}

/// Everything one cycle produced, before it is stamped with latency.
#[derive(Clone, Debug, Default)]
pub struct AggregateInput {
    pub timestamp_ms: i64,
    pub image_width: u32,
    pub image_height: u32,
    pub rule_pose: RulePose,
    pub frame_labels: Vec<FrameLabel>,
    pub temporal_verdicts: Vec<TemporalVerdict>,
    pub rejected: Vec<RejectedFrame>,
}

pub fn aggregate(input: AggregateInput, received_at: Instant) -> ClassificationResult {
    let positive = input.temporal_verdicts.iter().any(|v| v.positive);
    let inference_time_ms = received_at.elapsed().as_millis() as u64;
    ClassificationResult {
        timestamp_ms: input.timestamp_ms,
        image_width: input.image_width,
        image_height: input.image_height,
        inference_time_ms,
        rule_pose: input.rule_pose,
        frame_labels: input.frame_labels,
        temporal_verdicts: input.temporal_verdicts,
        positive,
        rejected: input.rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn verdict(person: u32, positive: bool) -> TemporalVerdict {
        TemporalVerdict {
            person: PersonKey(person),
            score: Some(if positive { 0.9 } else { 0.1 }),
            positive,
            ready: true,
        }
    }

    #[test]
    fn any_positive_person_makes_result_positive() {
        let input = AggregateInput {
            timestamp_ms: 42,
            image_width: 640,
            image_height: 480,
            temporal_verdicts: vec![verdict(0, false), verdict(1, true)],
            ..AggregateInput::default()
        };
        let result = aggregate(input, Instant::now());
        assert!(result.positive);
        assert_eq!(result.positive_persons().collect::<Vec<_>>(), vec![PersonKey(1)]);
        assert_eq!((result.image_width, result.image_height), (640, 480));
        assert_eq!(result.timestamp_ms, 42);
    }

    #[test]
    fn no_verdicts_is_negative() {
        let result = aggregate(AggregateInput::default(), Instant::now());
        assert!(!result.positive);
        assert_eq!(result.rule_pose, RulePose::Unknown);
    }

    #[test]
    fn latency_counts_from_receipt() {
        let received = Instant::now() - Duration::from_millis(25);
        let result = aggregate(AggregateInput::default(), received);
        assert!(result.inference_time_ms >= 25);
    }

    #[test]
    fn result_serializes_for_downstream() {
        let input = AggregateInput {
            rule_pose: RulePose::Squat,
            frame_labels: vec![FrameLabel {
                person: PersonKey(0),
                label: "Sitting".to_string(),
            }],
            ..AggregateInput::default()
        };
        let json = serde_json::to_value(aggregate(input, Instant::now())).unwrap();
        assert_eq!(json["rule_pose"], "Squat");
        assert_eq!(json["frame_labels"][0]["person"], 0);
        assert_eq!(json["frame_labels"][0]["label"], "Sitting");
    }
}
