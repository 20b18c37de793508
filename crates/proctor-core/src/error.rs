//! Engine error types.
//!
//! `SessionError` is returned when the state machine rejects an operation.
//! `EnvironmentError` is raised by a [`ProctoringEnvironment`] implementation
//! and lives here so the session controller can decide whether a failed
//! capability call aborts `start()` or is merely logged.
//!
//! [`ProctoringEnvironment`]: crate::traits::ProctoringEnvironment

use thiserror::Error;

use crate::session::SessionPhase;
use crate::signal::SignalKind;

/// Errors returned by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation is not valid in the session's current phase.
    #[error("cannot {operation} while the session is {phase}")]
    InvalidState {
        operation: &'static str,
        phase: SessionPhase,
    },

    /// `submit` was called before every question had an answer.
    #[error("cannot submit: {answered} of {total} questions answered")]
    IncompleteAnswers { answered: usize, total: usize },

    /// `next_question` was called while the current question is unanswered.
    #[error("question '{question_id}' must be answered before moving on")]
    UnansweredQuestion { question_id: String },

    /// An answer was given for a question that is not part of the test.
    #[error("unknown question: {question_id}")]
    UnknownQuestion { question_id: String },

    /// The requested test id is not in the catalog.
    #[error("test not found: {test_id}")]
    TestNotFound { test_id: String },

    /// A capability call on the proctoring environment failed.
    #[error("proctoring environment error: {0}")]
    Environment(#[from] EnvironmentError),
}

impl SessionError {
    /// Returns `true` for the configuration error case (unknown test id),
    /// where no session exists and only cancellation is offered.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, SessionError::TestNotFound { .. })
    }
}

/// Errors raised by a proctoring environment.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// Attaching a listener failed.
    #[error("failed to subscribe to {kind} signals: {reason}")]
    SubscriptionFailed { kind: SignalKind, reason: String },

    /// The environment refused to enter fullscreen.
    #[error("fullscreen request denied: {0}")]
    FullscreenDenied(String),
}

impl EnvironmentError {
    /// Returns `true` if the session may continue despite this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EnvironmentError::FullscreenDenied(_))
    }
}
