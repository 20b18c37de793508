//! Assembles the final `TestResult` for an attempt.

use chrono::{DateTime, Utc};

use crate::history::AttemptContext;
use crate::model::{AnswerSet, TestDefinition, TestResult};
use crate::scorer::{self, Score};

/// Termination reason recorded for a user-initiated early end.
pub const FORCE_END_REASON: &str = "user ended early";

/// How an attempt reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    /// Explicit submit with every question answered.
    Submitted,
    /// The countdown reached zero.
    TimeExpired,
    /// The candidate ended the test early; partial credit applies.
    ForceEnded { current_index: usize },
    /// The proctoring policy ended the test; the score is always zero.
    Violation { reason: String },
}

impl Finish {
    /// Whether this finish counts as a submission rather than a termination.
    pub fn is_submission(&self) -> bool {
        matches!(self, Finish::Submitted | Finish::TimeExpired)
    }

    pub fn termination_reason(&self) -> Option<String> {
        match self {
            Finish::Submitted | Finish::TimeExpired => None,
            Finish::ForceEnded { .. } => Some(FORCE_END_REASON.to_string()),
            Finish::Violation { reason } => Some(reason.clone()),
        }
    }
}

/// Grade the answers as the finish kind requires. Violations never consult
/// the scorer's correctness.
pub fn score_for(test: &TestDefinition, answers: &AnswerSet, finish: &Finish) -> Score {
    match finish {
        Finish::Submitted | Finish::TimeExpired => scorer::score_answers(test, answers),
        Finish::ForceEnded { current_index } => scorer::score_through(test, answers, *current_index),
        Finish::Violation { .. } => Score::zeroed(test, answers),
    }
}

/// Build the result record for a finished attempt.
pub fn assemble(
    test: &TestDefinition,
    context: &AttemptContext,
    answers: &AnswerSet,
    finish: &Finish,
    completed_at: DateTime<Utc>,
) -> TestResult {
    let score = score_for(test, answers, finish);
    TestResult {
        test_id: test.id.clone(),
        component_id: context.component_id.clone(),
        roadmap_id: context.roadmap_id.clone(),
        score: score.score,
        rating: score.rating,
        stars: score.stars,
        passed: score.passed,
        attempt_count: context.prior_attempts.saturating_add(1),
        completed_at,
        answers: score.graded,
        termination_reason: finish.termination_reason(),
    }
}
