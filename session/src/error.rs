//! Errors reported by the session to its caller.

use quiz_defence_core::{SessionPhase, StageId};
use quiz_defence_system_abilities::AbilityRejection;
use thiserror::Error;

/// Precondition failures detected before any runtime state is created.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The catalog has no stage with the requested identifier.
    #[error("stage {} is not in the catalog", .0.get())]
    StageNotFound(StageId),
    /// The stage defines no units.
    #[error("stage {} has an empty roster", .0.get())]
    EmptyRoster(StageId),
    /// The stage lists more spawn delays than units.
    #[error("stage {} lists {delays} spawn delays for {units} units", .stage.get())]
    ScheduleMismatch {
        /// Offending stage.
        stage: StageId,
        /// Number of roster entries.
        units: usize,
        /// Number of spawn delays.
        delays: usize,
    },
    /// The question source is empty.
    #[error("no questions are available")]
    NoQuestions,
    /// A question has no options or its answer index is out of range.
    #[error("question {0} has no valid answer")]
    InvalidQuestion(usize),
    /// An attempt was started before a stage was selected.
    #[error("no stage has been selected")]
    NoStageSelected,
    /// The requested phase cannot be entered from the current one.
    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current phase.
        from: SessionPhase,
        /// Requested phase.
        to: SessionPhase,
    },
}

/// Player actions refused by the session; none of them mutate runtime state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionRejected {
    /// The attempt is not in play.
    #[error("the attempt is not in play")]
    NotPlaying,
    /// The player is stunned by a wrong answer.
    #[error("the player is stunned")]
    Stunned,
    /// The submitted option does not exist for the current question.
    #[error("option {0} does not exist for the current question")]
    InvalidOption(usize),
    /// The ability system refused the request.
    #[error(transparent)]
    Ability(#[from] AbilityRejection),
}
