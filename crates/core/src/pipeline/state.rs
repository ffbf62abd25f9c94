//! Pure task state machine.
//!
//! Given a persisted [`TaskStatus`], decides which stage runs next and how a
//! stage's outcome updates the status. No I/O happens here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::TaskStatus;

/// Where a task is in its lifecycle.
///
/// `Acquiring`, `Transcoding` and `Publishing` only exist while a stage is
/// in flight; the persisted checkpoints map to the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    New,
    Acquiring,
    Acquired,
    Transcoding,
    Transcoded,
    Publishing,
    Published,
    Done,
}

impl PipelineState {
    /// Returns the string representation for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::New => "new",
            PipelineState::Acquiring => "acquiring",
            PipelineState::Acquired => "acquired",
            PipelineState::Transcoding => "transcoding",
            PipelineState::Transcoded => "transcoded",
            PipelineState::Publishing => "publishing",
            PipelineState::Published => "published",
            PipelineState::Done => "done",
        }
    }

    /// The checkpoint state recorded by `status`.
    pub fn from_status(status: &TaskStatus) -> Self {
        if status.done {
            PipelineState::Done
        } else if status.published {
            PipelineState::Published
        } else if status.transcoded_path.is_some() {
            PipelineState::Transcoded
        } else if status.acquired_path.is_some() {
            PipelineState::Acquired
        } else {
            PipelineState::New
        }
    }

    /// Whether no further stage will run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work that moves a task to its next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Transcode,
    Publish,
    Finish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Transcode => "transcode",
            Stage::Publish => "publish",
            Stage::Finish => "finish",
        }
    }

    /// State reported while this stage is in flight.
    pub fn in_flight_state(&self) -> PipelineState {
        match self {
            Stage::Acquire => PipelineState::Acquiring,
            Stage::Transcode => PipelineState::Transcoding,
            Stage::Publish => PipelineState::Publishing,
            Stage::Finish => PipelineState::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Content is on local disk at this path.
    Acquired(String),
    /// Encoded output is on local disk at this path.
    Transcoded(String),
    Published,
    Finished,
}

impl StageOutcome {
    /// The stage that produces this outcome.
    pub fn stage(&self) -> Stage {
        match self {
            StageOutcome::Acquired(_) => Stage::Acquire,
            StageOutcome::Transcoded(_) => Stage::Transcode,
            StageOutcome::Published => Stage::Publish,
            StageOutcome::Finished => Stage::Finish,
        }
    }
}

/// Rejected state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot apply {stage} outcome in state {state}")]
    OutOfOrder { stage: Stage, state: PipelineState },

    #[error("task is already done")]
    AlreadyDone,
}

/// The next stage to run for `status`, or `None` once done.
///
/// With publishing disabled the publish stage is skipped entirely.
pub fn next_stage(status: &TaskStatus, publish_enabled: bool) -> Option<Stage> {
    if status.done {
        None
    } else if status.acquired_path.is_none() {
        Some(Stage::Acquire)
    } else if status.transcoded_path.is_none() {
        Some(Stage::Transcode)
    } else if publish_enabled && !status.published {
        Some(Stage::Publish)
    } else {
        Some(Stage::Finish)
    }
}

/// Apply a stage outcome, returning the new status.
///
/// Fields are only ever set in stage order; an outcome whose prerequisites
/// are missing, or whose checkpoint is already recorded, is rejected. With
/// publishing enabled a task cannot finish before it is published, and with
/// publishing disabled it cannot be published at all.
pub fn apply(
    status: &TaskStatus,
    outcome: StageOutcome,
    publish_enabled: bool,
) -> Result<TaskStatus, TransitionError> {
    if status.done {
        return Err(TransitionError::AlreadyDone);
    }

    let out_of_order = || TransitionError::OutOfOrder {
        stage: outcome.stage(),
        state: PipelineState::from_status(status),
    };

    let mut next = status.clone();
    match &outcome {
        StageOutcome::Acquired(path) => {
            if status.acquired_path.is_some() {
                return Err(out_of_order());
            }
            next.acquired_path = Some(path.clone());
        }
        StageOutcome::Transcoded(path) => {
            if status.acquired_path.is_none() || status.transcoded_path.is_some() {
                return Err(out_of_order());
            }
            next.transcoded_path = Some(path.clone());
        }
        StageOutcome::Published => {
            if !publish_enabled || status.transcoded_path.is_none() || status.published {
                return Err(out_of_order());
            }
            next.published = true;
        }
        StageOutcome::Finished => {
            if status.transcoded_path.is_none() || (publish_enabled && !status.published) {
                return Err(out_of_order());
            }
            next.done = true;
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquired() -> TaskStatus {
        TaskStatus {
            acquired_path: Some("/data/abc123.mkv".to_string()),
            ..TaskStatus::default()
        }
    }

    fn transcoded() -> TaskStatus {
        TaskStatus {
            transcoded_path: Some("/data/[Group] Show [01].mkv".to_string()),
            ..acquired()
        }
    }

    #[test]
    fn test_next_stage_sequence_with_publish() {
        let mut status = TaskStatus::new();
        let mut stages = Vec::new();
        while let Some(stage) = next_stage(&status, true) {
            stages.push(stage);
            let outcome = match stage {
                Stage::Acquire => StageOutcome::Acquired("/a".to_string()),
                Stage::Transcode => StageOutcome::Transcoded("/b".to_string()),
                Stage::Publish => StageOutcome::Published,
                Stage::Finish => StageOutcome::Finished,
            };
            status = apply(&status, outcome, true).unwrap();
            assert!(status.is_monotonic(true));
        }
        assert_eq!(
            stages,
            vec![Stage::Acquire, Stage::Transcode, Stage::Publish, Stage::Finish]
        );
        assert!(status.done && status.published);
    }

    #[test]
    fn test_next_stage_skips_publish_when_disabled() {
        assert_eq!(next_stage(&transcoded(), false), Some(Stage::Finish));
        assert_eq!(next_stage(&transcoded(), true), Some(Stage::Publish));

        let done = apply(&transcoded(), StageOutcome::Finished, false).unwrap();
        assert!(done.done);
        assert!(!done.published);
        assert!(done.is_monotonic(false));
    }

    #[test]
    fn test_next_stage_resumes_from_checkpoint() {
        assert_eq!(next_stage(&TaskStatus::new(), true), Some(Stage::Acquire));
        assert_eq!(next_stage(&acquired(), true), Some(Stage::Transcode));
        let mut done = transcoded();
        done.done = true;
        assert_eq!(next_stage(&done, true), None);
    }

    #[test]
    fn test_apply_rejects_out_of_order() {
        let err = apply(&TaskStatus::new(), StageOutcome::Transcoded("/b".to_string()), true)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::OutOfOrder {
                stage: Stage::Transcode,
                state: PipelineState::New,
            }
        );

        assert!(apply(&acquired(), StageOutcome::Published, true).is_err());
        assert!(apply(&acquired(), StageOutcome::Finished, true).is_err());
        assert!(apply(&acquired(), StageOutcome::Acquired("/c".to_string()), true).is_err());
    }

    #[test]
    fn test_apply_rejects_done_task() {
        let mut done = transcoded();
        done.done = true;
        assert_eq!(
            apply(&done, StageOutcome::Finished, true),
            Err(TransitionError::AlreadyDone)
        );
    }

    #[test]
    fn test_finish_requires_publish_when_enabled() {
        let err = apply(&transcoded(), StageOutcome::Finished, true).unwrap_err();
        assert_eq!(
            err,
            TransitionError::OutOfOrder {
                stage: Stage::Finish,
                state: PipelineState::Transcoded,
            }
        );

        let published = apply(&transcoded(), StageOutcome::Published, true).unwrap();
        let done = apply(&published, StageOutcome::Finished, true).unwrap();
        assert!(done.done && done.published);
        assert!(done.is_monotonic(true));
    }

    #[test]
    fn test_publish_rejected_when_disabled() {
        assert!(matches!(
            apply(&transcoded(), StageOutcome::Published, false),
            Err(TransitionError::OutOfOrder {
                stage: Stage::Publish,
                ..
            })
        ));
    }

    #[test]
    fn test_state_from_status() {
        assert_eq!(PipelineState::from_status(&TaskStatus::new()), PipelineState::New);
        assert_eq!(PipelineState::from_status(&acquired()), PipelineState::Acquired);
        assert_eq!(PipelineState::from_status(&transcoded()), PipelineState::Transcoded);

        let mut status = transcoded();
        status.published = true;
        assert_eq!(PipelineState::from_status(&status), PipelineState::Published);
        status.done = true;
        assert!(PipelineState::from_status(&status).is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert_eq!(Stage::Acquire.in_flight_state(), PipelineState::Acquiring);
        assert_eq!(Stage::Transcode.in_flight_state(), PipelineState::Transcoding);
        assert_eq!(Stage::Publish.in_flight_state(), PipelineState::Publishing);
    }
}
