//! A classification session: every stage built from one `PipelineConfig`.
//!
//! The session is a value. Changing the delegate, model variant, window
//! length or thresholds means building a new one through `rebuild`, which
//! drops the old models before loading the new ones. Slot history does not
//! survive a rebuild.

use crate::aggregate::{aggregate, AggregateInput, ClassificationResult, FrameLabel, RejectedFrame};
use crate::buffer::{IdentityAssigner, PersonKey, PositionalIdentity, SequenceBuffer};
use crate::classify::{rules, LabelTable, PoseClassifier, RulePose};
use crate::config::PipelineConfig;
use crate::error::{PipelineFault, PoseError};
use crate::frame::FrameInput;
use crate::landmark::{normalize, FeatureVector, PersonFrame};
use crate::model::{load_model, ModelBackend, ModelShape};
use crate::temporal::TemporalClassifier;

pub struct Session {
    config: PipelineConfig,
    identity: Box<dyn IdentityAssigner>,
    pose: PoseClassifier,
    temporal: TemporalClassifier,
    buffer: SequenceBuffer,
    faults: Vec<PipelineFault>,
}

impl Session {
    /// Load the label table and both models.
    ///
    /// A malformed label table fails the whole session. A model that fails to
    /// load leaves its classifier uninitialized and records a fault, picked up
    /// with `take_faults`.
    pub fn open(config: PipelineConfig) -> Result<Self, PoseError> {
        let labels = LabelTable::load(&config.models.labels)?;
        let mut faults = Vec::new();

        let pose = match load_model(
            &config.models.pose_classifier,
            config.delegate,
            ModelShape::per_frame(labels.len()),
        )
        .and_then(|model| PoseClassifier::new(model, labels.clone()))
        {
            Ok(classifier) => classifier,
            Err(err) => {
                log::error!("pose classifier unavailable: {}", err);
                faults.push(PipelineFault::from_error(&err, config.delegate));
                PoseClassifier::uninitialized(labels)
            }
        };

        let temporal = match load_model(
            &config.models.temporal_classifier,
            config.delegate,
            ModelShape::sequence(config.sequence_length),
        )
        .and_then(|model| {
            TemporalClassifier::new(model, config.sequence_length, config.decision_threshold)
        }) {
            Ok(classifier) => classifier,
            Err(err) => {
                log::error!("temporal classifier unavailable: {}", err);
                faults.push(PipelineFault::from_error(&err, config.delegate));
                TemporalClassifier::uninitialized(config.sequence_length, config.decision_threshold)
            }
        };

        log::info!(
            "session opened: delegate={:?} variant={:?} window={} threshold={} labels={}",
            config.delegate,
            config.detector.variant,
            config.sequence_length,
            config.decision_threshold,
            pose.labels().len()
        );
        Ok(Self::assemble(config, pose, temporal, faults))
    }

    /// Build from already-constructed models. `None` leaves that classifier uninitialized.
    pub fn from_parts(
        config: PipelineConfig,
        pose_model: Option<Box<dyn ModelBackend>>,
        temporal_model: Option<Box<dyn ModelBackend>>,
        labels: LabelTable,
    ) -> Result<Self, PoseError> {
        let pose = match pose_model {
            Some(model) => PoseClassifier::new(model, labels)?,
            None => PoseClassifier::uninitialized(labels),
        };
        let temporal = match temporal_model {
            Some(model) => {
                TemporalClassifier::new(model, config.sequence_length, config.decision_threshold)?
            }
            None => {
                TemporalClassifier::uninitialized(config.sequence_length, config.decision_threshold)
            }
        };
        Ok(Self::assemble(config, pose, temporal, Vec::new()))
    }

    fn assemble(
        config: PipelineConfig,
        pose: PoseClassifier,
        temporal: TemporalClassifier,
        faults: Vec<PipelineFault>,
    ) -> Self {
        Self {
            buffer: SequenceBuffer::new(config.sequence_length),
            config,
            identity: Box::new(PositionalIdentity),
            pose,
            temporal,
            faults,
        }
    }

    /// Replace the identity strategy. Existing slots are kept.
    pub fn with_identity(mut self, identity: Box<dyn IdentityAssigner>) -> Self {
        self.identity = identity;
        self
    }

    /// Tear this session down and open a new one from `config`.
    ///
    /// The identity strategy carries over; slots, models and faults do not.
    pub fn rebuild(self, config: PipelineConfig) -> Result<Self, PoseError> {
        let identity = self.into_identity();
        log::info!("rebuilding session");
        Ok(Self::open(config)?.with_identity(identity))
    }

    /// Release models and slots, keeping only the identity strategy.
    pub fn into_identity(self) -> Box<dyn IdentityAssigner> {
        let Session {
            identity,
            pose,
            temporal,
            buffer,
            ..
        } = self;
        drop((pose, temporal, buffer));
        identity
    }

    /// Faults recorded since the last call.
    pub fn take_faults(&mut self) -> Vec<PipelineFault> {
        std::mem::take(&mut self.faults)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &SequenceBuffer {
        &self.buffer
    }

    pub fn labels(&self) -> &LabelTable {
        self.pose.labels()
    }

    /// Run one inference cycle.
    pub fn process(&mut self, frame: &FrameInput) -> ClassificationResult {
        let keys = self.assign_keys(&frame.persons);
        let rule_pose = first_person_rule(&frame.persons);

        let layouts = (
            self.config.models.pose_layout,
            self.config.models.temporal_layout,
        );
        let mut frame_labels = Vec::with_capacity(frame.persons.len());
        let mut rejected = Vec::new();
        let mut observations: Vec<(PersonKey, Option<FeatureVector>)> =
            Vec::with_capacity(frame.persons.len());

        for (key, person) in keys.into_iter().zip(&frame.persons) {
            let temporal_features = match normalize(person, layouts.1) {
                Ok(features) => features,
                Err(err) => {
                    log::warn!("rejected frame for {}: {}", key, err);
                    rejected.push(RejectedFrame {
                        person: key,
                        reason: err.to_string(),
                    });
                    observations.push((key, None));
                    continue;
                }
            };
            let label = if layouts.0 == layouts.1 {
                self.pose.label_for(temporal_features.as_slice())
            } else {
                match normalize(person, layouts.0) {
                    Ok(features) => self.pose.label_for(features.as_slice()),
                    Err(err) => format!("Invalid input: {}", err),
                }
            };
            frame_labels.push(FrameLabel { person: key, label });
            observations.push((key, Some(temporal_features)));
        }

        let report = self.buffer.record_cycle(observations);
        for key in &report.created {
            log::debug!("slot created for {}", key);
        }
        for key in &report.became_ready {
            log::debug!("slot ready for {}", key);
        }
        for key in &report.removed {
            log::debug!("slot removed for {}", key);
        }

        let temporal_verdicts = self.temporal.evaluate_all(&self.buffer);

        aggregate(
            AggregateInput {
                timestamp_ms: frame.timestamp_ms,
                image_width: frame.width,
                image_height: frame.height,
                rule_pose,
                frame_labels,
                temporal_verdicts,
                rejected,
            },
            frame.received_at(),
        )
    }

    fn assign_keys(&mut self, persons: &[PersonFrame]) -> Vec<PersonKey> {
        let keys = self.identity.assign(persons);
        if keys.len() == persons.len() {
            return keys;
        }
        log::warn!(
            "identity assigner returned {} keys for {} persons; using detection order",
            keys.len(),
            persons.len()
        );
        PositionalIdentity.assign(persons)
    }
}

/// Geometric rules look at the first detected person only.
fn first_person_rule(persons: &[PersonFrame]) -> RulePose {
    persons
        .first()
        .and_then(|person| person.landmarks().ok())
        .map(rules::evaluate)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Keypoint, LANDMARK_COUNT};
    use crate::model::StubModel;

    fn labels() -> LabelTable {
        LabelTable::parse("0=Standing\n1=Sitting\n").unwrap()
    }

    fn config(n: usize) -> PipelineConfig {
        PipelineConfig {
            sequence_length: n,
            ..PipelineConfig::default()
        }
    }

    fn person() -> PersonFrame {
        PersonFrame::new(vec![Keypoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT])
    }

    fn labels_asset() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/pose_labels.txt")
    }

    fn stub_session(n: usize) -> Session {
        Session::from_parts(
            config(n),
            Some(Box::new(StubModel::zero(ModelShape::per_frame(2)))),
            Some(Box::new(StubModel::zero(ModelShape::sequence(n)))),
            labels(),
        )
        .unwrap()
    }

    #[test]
    fn every_person_gets_a_label_and_a_slot() {
        let mut session = stub_session(3);
        let frame = FrameInput::new(1, 640, 480, vec![person(), person()]);
        let result = session.process(&frame);

        assert_eq!(result.frame_labels.len(), 2);
        assert_eq!(result.frame_labels[0].label, crate::classify::NOT_RECOGNIZED);
        assert_eq!(result.temporal_verdicts.len(), 2);
        assert_eq!(session.buffer().len(), 2);
    }

    #[test]
    fn bad_person_frame_is_rejected_without_touching_others() {
        let mut session = stub_session(3);
        let short = PersonFrame::new(vec![Keypoint::default(); 12]);
        let result = session.process(&FrameInput::new(1, 640, 480, vec![short, person()]));

        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].person, PersonKey(0));
        assert!(result.rejected[0].reason.contains("expected 33, got 12"));
        assert!(!session.buffer().contains(PersonKey(0)));
        assert_eq!(session.buffer().get(PersonKey(1)).unwrap().len(), 1);
    }

    #[test]
    fn uninitialized_models_degrade_instead_of_failing() {
        let mut session = Session::from_parts(config(1), None, None, labels()).unwrap();
        let result = session.process(&FrameInput::new(1, 10, 10, vec![person()]));
        assert_eq!(result.frame_labels[0].label, crate::classify::MODEL_UNAVAILABLE);
        assert!(result.temporal_verdicts[0].ready);
        assert!(!result.positive);
    }

    #[test]
    fn open_with_missing_model_records_a_fault() {
        let mut cfg = config(2);
        cfg.models.labels = labels_asset();
        cfg.models.temporal_classifier = "/missing/temporal.onnx".to_string();
        let mut session = Session::open(cfg).unwrap();

        let faults = session.take_faults();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].message.contains("/missing/temporal.onnx"));
        assert!(session.take_faults().is_empty());
    }

    #[test]
    fn open_fails_on_malformed_label_table() {
        let mut cfg = config(2);
        cfg.models.labels = "/missing/labels.txt".into();
        assert!(matches!(
            Session::open(cfg),
            Err(PoseError::LabelTableMalformed(_))
        ));
    }

    #[test]
    fn rebuild_resets_slot_history() {
        let mut cfg = config(2);
        cfg.models.labels = labels_asset();
        let mut session = Session::open(cfg.clone()).unwrap();
        session.process(&FrameInput::new(1, 10, 10, vec![person()]));
        assert_eq!(session.buffer().len(), 1);

        cfg.sequence_length = 4;
        let session = session.rebuild(cfg).unwrap();
        assert!(session.buffer().is_empty());
        assert_eq!(session.buffer().capacity(), 4);
    }
}
