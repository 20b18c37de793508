//! Session controller: the lifecycle state machine for one attempt.
//!
//! Every mutation goes through [`ProctoredSession::dispatch`], which checks
//! the terminal-state latch before anything else. All terminal paths
//! (submit, timer expiry, violation, force-end) funnel into one `finalize`
//! step, so the completion handler fires at most once per session.
//!
//! ```text
//! NotStarted --acknowledge--> RulesAcknowledged --start--> InProgress
//!     |                            |                       |  submit / timer expiry --> Submitted
//!     +--------cancel--------------+--> Cancelled          |  force-end / violation --> Terminated
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emitter::{self, Finish};
use crate::error::SessionError;
use crate::history::AttemptContext;
use crate::model::{AnswerSet, AnswerValue, Question, TestCatalog, TestDefinition, TestResult};
use crate::monitor::{ProctoringMonitor, ProctoringPolicy, Verdict};
use crate::signal::EnvironmentSignal;
use crate::timer::{CountdownTimer, TimeUrgency, TimerTick, UrgencyThresholds};
use crate::traits::{ProctoringEnvironment, SessionHandler};

/// Lifecycle phase without payload, for comparisons and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    RulesAcknowledged,
    InProgress,
    Submitted,
    Terminated,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Submitted | SessionPhase::Terminated | SessionPhase::Cancelled
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::RulesAcknowledged => "rules acknowledged",
            SessionPhase::InProgress => "in progress",
            SessionPhase::Submitted => "submitted",
            SessionPhase::Terminated => "terminated",
            SessionPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Lifecycle state. Terminal variants carry the result they produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    NotStarted,
    RulesAcknowledged,
    InProgress,
    Submitted { result: Box<TestResult> },
    Terminated { result: Box<TestResult> },
    Cancelled,
}

impl SessionStatus {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionStatus::NotStarted => SessionPhase::NotStarted,
            SessionStatus::RulesAcknowledged => SessionPhase::RulesAcknowledged,
            SessionStatus::InProgress => SessionPhase::InProgress,
            SessionStatus::Submitted { .. } => SessionPhase::Submitted,
            SessionStatus::Terminated { .. } => SessionPhase::Terminated,
            SessionStatus::Cancelled => SessionPhase::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }

    pub fn result(&self) -> Option<&TestResult> {
        match self {
            SessionStatus::Submitted { result } | SessionStatus::Terminated { result } => {
                Some(result)
            }
            _ => None,
        }
    }
}

/// Answered/total counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub unanswered: usize,
    pub percent: u32,
}

/// Mutable state of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub answers: AnswerSet,
    pub time_left_seconds: u32,
    /// Soft violations seen so far. Never decreases.
    pub warning_count: u32,
    pub termination_reason: Option<String>,
}

impl SessionState {
    fn new(time_left_seconds: u32) -> Self {
        Self {
            status: SessionStatus::NotStarted,
            current_question_index: 0,
            answers: AnswerSet::new(),
            time_left_seconds,
            warning_count: 0,
            termination_reason: None,
        }
    }

    pub fn progress(&self, total: usize) -> Progress {
        let answered = self.answers.len().min(total);
        let percent = if total == 0 {
            0
        } else {
            (answered * 100 / total) as u32
        };
        Progress {
            answered,
            total,
            unanswered: total - answered,
            percent,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AcknowledgeRules,
    Start,
    Cancel,
    SelectAnswer {
        question_id: String,
        value: AnswerValue,
    },
    NextQuestion,
    PreviousQuestion,
    Submit,
    ForceEnd,
    /// One second elapsed on the countdown.
    Tick,
    Signal(EnvironmentSignal),
}

impl SessionEvent {
    pub fn answer(question_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        SessionEvent::SelectAnswer {
            question_id: question_id.into(),
            value: value.into(),
        }
    }
}

/// What an accepted event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed; the session is still live.
    Applied,
    /// A soft violation was recorded and the candidate warned.
    Warned { warning_count: u32 },
    /// The session reached a terminal phase on this event.
    Finished,
    /// Nothing changed: the session is finished or the event does not apply.
    Ignored,
}

/// Per-session tuning.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub policy: ProctoringPolicy,
    pub thresholds: UrgencyThresholds,
}

/// One proctored attempt at a test.
pub struct ProctoredSession<E: ProctoringEnvironment, H: SessionHandler> {
    id: Uuid,
    test: Arc<TestDefinition>,
    context: AttemptContext,
    state: SessionState,
    timer: CountdownTimer,
    monitor: ProctoringMonitor,
    environment: E,
    handler: H,
}

impl<E: ProctoringEnvironment, H: SessionHandler> ProctoredSession<E, H> {
    pub fn new(test: Arc<TestDefinition>, context: AttemptContext, environment: E, handler: H) -> Self {
        Self::with_options(test, context, environment, handler, SessionOptions::default())
    }

    pub fn with_options(
        test: Arc<TestDefinition>,
        context: AttemptContext,
        environment: E,
        handler: H,
        options: SessionOptions,
    ) -> Self {
        let limit = test.time_limit_secs();
        Self {
            id: Uuid::new_v4(),
            state: SessionState::new(limit),
            timer: CountdownTimer::new(limit).with_thresholds(options.thresholds),
            monitor: ProctoringMonitor::new(options.policy),
            test,
            context,
            environment,
            handler,
        }
    }

    /// Look the test up in `catalog` and create a session for it.
    ///
    /// An unknown id is a configuration error: no session exists and the
    /// caller can only cancel.
    pub fn open(
        catalog: &TestCatalog,
        test_id: &str,
        context: AttemptContext,
        environment: E,
        handler: H,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let test = catalog.get(test_id).ok_or_else(|| SessionError::TestNotFound {
            test_id: test_id.to_string(),
        })?;
        Ok(Self::with_options(test, context, environment, handler, options))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    pub fn context(&self) -> &AttemptContext {
        &self.context
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.status.phase()
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase() == SessionPhase::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.state.status.is_terminal()
    }

    /// The result, once the session has been submitted or terminated.
    pub fn result(&self) -> Option<&TestResult> {
        self.state.status.result()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn urgency(&self) -> TimeUrgency {
        self.timer.urgency()
    }

    pub fn progress(&self) -> Progress {
        self.state.progress(self.test.questions.len())
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.test.questions.get(self.state.current_question_index)
    }

    /// Whether every question has an answer.
    pub fn can_submit(&self) -> bool {
        self.state.answers.len() == self.test.questions.len()
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn acknowledge_rules(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::AcknowledgeRules)
    }

    /// Enter `InProgress`: attach listeners, request fullscreen, start the clock.
    pub fn start(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Start)
    }

    pub fn cancel(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Cancel)
    }

    /// Record an answer. The value is not checked against the question's
    /// options or type.
    pub fn select_answer(
        &mut self,
        question_id: impl Into<String>,
        value: impl Into<AnswerValue>,
    ) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::answer(question_id, value))
    }

    pub fn next_question(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::NextQuestion)
    }

    pub fn previous_question(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::PreviousQuestion)
    }

    pub fn submit(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Submit)
    }

    pub fn force_end(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::ForceEnd)
    }

    pub fn tick(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Tick)
    }

    pub fn handle_signal(&mut self, signal: EnvironmentSignal) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Signal(signal))
    }

    /// Apply one event to the state machine.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        if self.is_finished() {
            tracing::debug!(session = %self.id, ?event, "session already {}, ignoring event", self.phase());
            return Ok(Transition::Ignored);
        }

        match event {
            SessionEvent::AcknowledgeRules => {
                self.require(SessionPhase::NotStarted, "acknowledge the rules")?;
                self.state.status = SessionStatus::RulesAcknowledged;
                Ok(Transition::Applied)
            }
            SessionEvent::Start => {
                self.require(SessionPhase::RulesAcknowledged, "start")?;
                self.begin()
            }
            SessionEvent::Cancel => match self.phase() {
                SessionPhase::NotStarted | SessionPhase::RulesAcknowledged => {
                    self.state.status = SessionStatus::Cancelled;
                    tracing::info!(session = %self.id, test = %self.test.id, "session cancelled before start");
                    self.handler.on_cancel();
                    Ok(Transition::Finished)
                }
                phase => Err(SessionError::InvalidState {
                    operation: "cancel",
                    phase,
                }),
            },
            SessionEvent::SelectAnswer { question_id, value } => {
                self.require(SessionPhase::InProgress, "answer")?;
                if self.test.question(&question_id).is_none() {
                    return Err(SessionError::UnknownQuestion { question_id });
                }
                self.state.answers.insert(question_id, value);
                Ok(Transition::Applied)
            }
            SessionEvent::NextQuestion => {
                self.require(SessionPhase::InProgress, "move to the next question")?;
                let Some(current) = self.current_question() else {
                    return Ok(Transition::Ignored);
                };
                if !self.state.answers.contains(&current.id) {
                    return Err(SessionError::UnansweredQuestion {
                        question_id: current.id.clone(),
                    });
                }
                if self.state.current_question_index + 1 < self.test.questions.len() {
                    self.state.current_question_index += 1;
                    Ok(Transition::Applied)
                } else {
                    Ok(Transition::Ignored)
                }
            }
            SessionEvent::PreviousQuestion => {
                self.require(SessionPhase::InProgress, "move to the previous question")?;
                if self.state.current_question_index == 0 {
                    return Ok(Transition::Ignored);
                }
                self.state.current_question_index -= 1;
                Ok(Transition::Applied)
            }
            SessionEvent::Submit => {
                self.require(SessionPhase::InProgress, "submit")?;
                if !self.can_submit() {
                    return Err(SessionError::IncompleteAnswers {
                        answered: self.state.answers.len(),
                        total: self.test.questions.len(),
                    });
                }
                self.finalize(Finish::Submitted)
            }
            SessionEvent::ForceEnd => {
                self.require(SessionPhase::InProgress, "end the test")?;
                let current_index = self.state.current_question_index;
                self.finalize(Finish::ForceEnded { current_index })
            }
            SessionEvent::Tick => {
                if !self.is_in_progress() {
                    return Ok(Transition::Ignored);
                }
                match self.timer.tick() {
                    TimerTick::Idle => Ok(Transition::Ignored),
                    TimerTick::Running { remaining_secs } => {
                        self.state.time_left_seconds = remaining_secs;
                        Ok(Transition::Applied)
                    }
                    TimerTick::Expired => {
                        self.state.time_left_seconds = 0;
                        tracing::info!(session = %self.id, "time limit reached, submitting current answers");
                        self.finalize(Finish::TimeExpired)
                    }
                }
            }
            SessionEvent::Signal(signal) => {
                if !self.is_in_progress() {
                    return Ok(Transition::Ignored);
                }
                match self.monitor.assess(&signal) {
                    Verdict::Allow => Ok(Transition::Ignored),
                    Verdict::Warn {
                        warning_count,
                        message,
                    } => {
                        self.state.warning_count = warning_count;
                        tracing::warn!(session = %self.id, warning_count, "{message}");
                        self.environment.show_warning(&message);
                        Ok(Transition::Warned { warning_count })
                    }
                    Verdict::Terminate {
                        warning_count,
                        reason,
                    } => {
                        self.state.warning_count = warning_count;
                        tracing::warn!(session = %self.id, warning_count, "{reason}");
                        self.finalize(Finish::Violation { reason })
                    }
                }
            }
        }
    }

    fn require(&self, expected: SessionPhase, operation: &'static str) -> Result<(), SessionError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState { operation, phase })
        }
    }

    fn begin(&mut self) -> Result<Transition, SessionError> {
        self.monitor.engage(&mut self.environment)?;
        self.timer.start();
        self.state.time_left_seconds = self.timer.remaining_secs();
        self.state.status = SessionStatus::InProgress;
        tracing::info!(
            session = %self.id,
            test = %self.test.id,
            questions = self.test.questions.len(),
            time_limit_secs = self.state.time_left_seconds,
            attempt = self.context.prior_attempts.saturating_add(1),
            "session started"
        );
        Ok(Transition::Applied)
    }

    /// The single terminal transition.
    fn finalize(&mut self, finish: Finish) -> Result<Transition, SessionError> {
        if self.is_finished() {
            return Ok(Transition::Ignored);
        }

        self.timer.stop();
        self.monitor.release(&mut self.environment);

        let result = emitter::assemble(
            &self.test,
            &self.context,
            &self.state.answers,
            &finish,
            Utc::now(),
        );
        self.state.termination_reason = result.termination_reason.clone();

        let boxed = Box::new(result.clone());
        self.state.status = if finish.is_submission() {
            SessionStatus::Submitted { result: boxed }
        } else {
            SessionStatus::Terminated { result: boxed }
        };

        tracing::info!(
            session = %self.id,
            test = %result.test_id,
            status = %self.phase(),
            score = result.score,
            passed = result.passed,
            attempt = result.attempt_count,
            "session finished"
        );

        self.handler.on_complete(result);
        Ok(Transition::Finished)
    }
}

impl<E: ProctoringEnvironment, H: SessionHandler> Drop for ProctoredSession<E, H> {
    fn drop(&mut self) {
        if self.monitor.is_engaged() || self.monitor.holds_fullscreen() {
            tracing::debug!(session = %self.id, "releasing proctoring resources on teardown");
        }
        self.timer.stop();
        self.monitor.release(&mut self.environment);
    }
}

impl<E: ProctoringEnvironment, H: SessionHandler> fmt::Debug for ProctoredSession<E, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProctoredSession")
            .field("id", &self.id)
            .field("test", &self.test.id)
            .field("phase", &self.phase())
            .field("current_question_index", &self.state.current_question_index)
            .field("answered", &self.state.answers.len())
            .field("time_left_seconds", &self.state.time_left_seconds)
            .field("warning_count", &self.state.warning_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::error::EnvironmentError;
    use crate::model::{Question, QuestionKind};
    use crate::signal::{ClipboardAction, KeyChord, SignalKind};
    use crate::traits::CollectingHandler;

    #[derive(Debug, Default)]
    struct EnvLog {
        subscribed: Vec<SignalKind>,
        fullscreen: bool,
        warnings: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct SharedEnv(Rc<RefCell<EnvLog>>);

    impl ProctoringEnvironment for SharedEnv {
        fn subscribe(&mut self, kind: SignalKind) -> Result<(), EnvironmentError> {
            self.0.borrow_mut().subscribed.push(kind);
            Ok(())
        }

        fn unsubscribe(&mut self, kind: SignalKind) {
            self.0.borrow_mut().subscribed.retain(|k| *k != kind);
        }

        fn request_fullscreen(&mut self) -> Result<(), EnvironmentError> {
            self.0.borrow_mut().fullscreen = true;
            Ok(())
        }

        fn exit_fullscreen(&mut self) {
            self.0.borrow_mut().fullscreen = false;
        }

        fn show_warning(&mut self, message: &str) {
            self.0.borrow_mut().warnings.push(message.to_string());
        }
    }

    type TestSession = ProctoredSession<SharedEnv, CollectingHandler>;

    /// Five questions worth 20 points each; the correct answer to `qN` is `aN`.
    fn five_questions() -> Arc<TestDefinition> {
        Arc::new(TestDefinition {
            id: "html-css-basics".into(),
            title: "HTML & CSS Fundamentals Test".into(),
            description: String::new(),
            questions: (0..5)
                .map(|i| Question {
                    id: format!("q{i}"),
                    question: format!("Question {i}"),
                    kind: QuestionKind::MultipleChoice,
                    options: vec![format!("a{i}"), "wrong".into()],
                    correct_answer: format!("a{i}"),
                    points: 20,
                })
                .collect(),
            time_limit_minutes: 1,
            passing_score_percent: 80,
            max_attempts: 3,
        })
    }

    fn started() -> (TestSession, SharedEnv) {
        let env = SharedEnv::default();
        let mut session = ProctoredSession::new(
            five_questions(),
            AttemptContext::new("html-basics", "frontend-react"),
            env.clone(),
            CollectingHandler::new(),
        );
        session.acknowledge_rules().unwrap();
        session.start().unwrap();
        (session, env)
    }

    fn answer_all_correctly(session: &mut TestSession) {
        for i in 0..5 {
            session.select_answer(format!("q{i}"), format!("a{i}")).unwrap();
        }
    }

    #[test]
    fn lifecycle_order_is_enforced() {
        let env = SharedEnv::default();
        let mut session = ProctoredSession::new(
            five_questions(),
            AttemptContext::new("c", "r"),
            env.clone(),
            CollectingHandler::new(),
        );
        assert!(matches!(
            session.start(),
            Err(SessionError::InvalidState {
                phase: SessionPhase::NotStarted,
                ..
            })
        ));
        assert!(session.select_answer("q0", "a0").is_err());
        assert_eq!(session.tick().unwrap(), Transition::Ignored);

        session.acknowledge_rules().unwrap();
        assert!(env.0.borrow().subscribed.is_empty());
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(env.0.borrow().subscribed.len(), SignalKind::ALL.len());
        assert!(env.0.borrow().fullscreen);
        assert!(session.timer_running());
        assert_eq!(session.state().time_left_seconds, 60);
    }

    #[test]
    fn force_end_with_large_point_values_still_finishes() {
        let mut test = (*five_questions()).clone();
        for question in &mut test.questions {
            question.points = 3_000_000_000;
        }
        let env = SharedEnv::default();
        let mut session = ProctoredSession::new(
            Arc::new(test),
            AttemptContext::new("html-basics", "frontend-react"),
            env.clone(),
            CollectingHandler::new(),
        );
        session.acknowledge_rules().unwrap();
        session.start().unwrap();
        session.select_answer("q0", "a0").unwrap();

        assert_eq!(session.force_end().unwrap(), Transition::Finished);
        assert_eq!(session.phase(), SessionPhase::Terminated);
        assert_eq!(session.result().unwrap().score, 20);
        assert_eq!(session.handler().results.len(), 1);
        assert!(env.0.borrow().subscribed.is_empty());
    }

    #[test]
    fn submit_all_correct_scores_full_marks() {
        let (mut session, env) = started();
        answer_all_correctly(&mut session);
        assert_eq!(session.submit().unwrap(), Transition::Finished);

        let result = session.result().unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.rating, 200);
        assert_eq!(result.stars, 2);
        assert!(result.passed);
        assert_eq!(session.phase(), SessionPhase::Submitted);
        assert_eq!(session.handler().results.len(), 1);
        assert!(env.0.borrow().subscribed.is_empty());
        assert!(!env.0.borrow().fullscreen);
        assert!(!session.timer_running());
    }

    #[test]
    fn submit_requires_every_answer() {
        let (mut session, _env) = started();
        session.select_answer("q0", "a0").unwrap();
        assert!(matches!(
            session.submit(),
            Err(SessionError::IncompleteAnswers {
                answered: 1,
                total: 5
            })
        ));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(session.handler().results.is_empty());
    }

    #[test]
    fn answers_are_overwritten_and_not_validated() {
        let (mut session, _env) = started();
        session.select_answer("q0", "wrong").unwrap();
        session.select_answer("q0", "not even an option").unwrap();
        session.select_answer("q1", true).unwrap();
        assert_eq!(session.state().answers.len(), 2);
        assert_eq!(
            session.state().answers.get("q0"),
            Some(&AnswerValue::Text("not even an option".into()))
        );
        assert!(matches!(
            session.select_answer("q99", "a"),
            Err(SessionError::UnknownQuestion { .. })
        ));
    }

    #[test]
    fn navigation_gates_and_clamps() {
        let (mut session, _env) = started();
        assert_eq!(session.previous_question().unwrap(), Transition::Ignored);
        assert!(matches!(
            session.next_question(),
            Err(SessionError::UnansweredQuestion { .. })
        ));

        answer_all_correctly(&mut session);
        for _ in 0..4 {
            assert_eq!(session.next_question().unwrap(), Transition::Applied);
        }
        assert_eq!(session.state().current_question_index, 4);
        assert_eq!(session.next_question().unwrap(), Transition::Ignored);
        assert_eq!(session.state().current_question_index, 4);

        session.previous_question().unwrap();
        assert_eq!(session.current_question().unwrap().id, "q3");
    }

    #[test]
    fn previous_has_no_answer_gate() {
        let (mut session, _env) = started();
        session.select_answer("q0", "a0").unwrap();
        session.next_question().unwrap();
        assert_eq!(session.previous_question().unwrap(), Transition::Applied);
        assert_eq!(session.state().current_question_index, 0);
    }

    #[test]
    fn first_soft_violation_warns_second_terminates_with_zero() {
        let (mut session, env) = started();
        answer_all_correctly(&mut session);

        let t = session
            .handle_signal(EnvironmentSignal::VisibilityChanged { hidden: true })
            .unwrap();
        assert_eq!(t, Transition::Warned { warning_count: 1 });
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(session.state().warning_count, 1);
        assert_eq!(env.0.borrow().warnings.len(), 1);

        let t = session.handle_signal(EnvironmentSignal::FocusLost).unwrap();
        assert_eq!(t, Transition::Finished);
        assert_eq!(session.phase(), SessionPhase::Terminated);
        let result = session.result().unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.stars, 0);
        assert!(!result.passed);
        assert!(result.termination_reason.is_some());
        assert_eq!(session.state().warning_count, 2);
        assert!(env.0.borrow().subscribed.is_empty());
    }

    #[test]
    fn single_clipboard_copy_terminates() {
        let (mut session, _env) = started();
        answer_all_correctly(&mut session);
        session
            .handle_signal(EnvironmentSignal::Clipboard {
                action: ClipboardAction::Copy,
            })
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Terminated);
        assert_eq!(session.result().unwrap().score, 0);
        assert_eq!(session.state().warning_count, 0);
    }

    #[test]
    fn blocked_shortcut_terminates_but_ordinary_keys_do_not() {
        let (mut session, _env) = started();
        let t = session
            .handle_signal(EnvironmentSignal::KeyPressed {
                chord: KeyChord::key("Tab"),
            })
            .unwrap();
        assert_eq!(t, Transition::Ignored);
        session
            .handle_signal(EnvironmentSignal::KeyPressed {
                chord: KeyChord::key("F12"),
            })
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Terminated);
        assert!(session
            .state()
            .termination_reason
            .as_deref()
            .unwrap()
            .contains("F12"));
    }

    #[test]
    fn timer_expiry_submits_incomplete_answers() {
        let (mut session, _env) = started();
        session.select_answer("q0", "a0").unwrap();
        session.select_answer("q1", "wrong").unwrap();

        for _ in 0..59 {
            assert_eq!(session.tick().unwrap(), Transition::Applied);
        }
        assert_eq!(session.state().time_left_seconds, 1);
        assert_eq!(session.urgency(), TimeUrgency::Critical);
        assert_eq!(session.tick().unwrap(), Transition::Finished);

        assert_eq!(session.phase(), SessionPhase::Submitted);
        assert_eq!(session.state().time_left_seconds, 0);
        let result = session.result().unwrap();
        assert_eq!(result.score, 20);
        assert!(result.termination_reason.is_none());
        assert_eq!(session.tick().unwrap(), Transition::Ignored);
    }

    #[test]
    fn force_end_scores_only_up_to_current_question() {
        let (mut session, _env) = started();
        answer_all_correctly(&mut session);
        session.next_question().unwrap();
        session.next_question().unwrap();
        assert_eq!(session.state().current_question_index, 2);

        session.force_end().unwrap();
        assert_eq!(session.phase(), SessionPhase::Terminated);
        let result = session.result().unwrap();
        assert_eq!(result.score, 60);
        assert_eq!(result.rating, 120);
        assert_eq!(result.stars, 1);
        assert_eq!(result.termination_reason.as_deref(), Some("user ended early"));
        assert_eq!(result.correct_count(), 3);
    }

    #[test]
    fn terminal_state_latch() {
        let (mut session, env) = started();
        answer_all_correctly(&mut session);
        session.submit().unwrap();
        let snapshot = session.state().clone();

        assert_eq!(session.submit().unwrap(), Transition::Ignored);
        assert_eq!(session.force_end().unwrap(), Transition::Ignored);
        assert_eq!(
            session.handle_signal(EnvironmentSignal::ContextMenu).unwrap(),
            Transition::Ignored
        );
        assert_eq!(
            session
                .handle_signal(EnvironmentSignal::VisibilityChanged { hidden: true })
                .unwrap(),
            Transition::Ignored
        );
        assert_eq!(session.select_answer("q0", "x").unwrap(), Transition::Ignored);
        assert_eq!(session.tick().unwrap(), Transition::Ignored);
        assert_eq!(session.cancel().unwrap(), Transition::Ignored);

        assert_eq!(session.state(), &snapshot);
        assert_eq!(session.handler().results.len(), 1);
        assert!(env.0.borrow().warnings.is_empty());
    }

    #[test]
    fn attempt_count_comes_from_context() {
        let mut session = ProctoredSession::new(
            five_questions(),
            AttemptContext::new("c", "r").with_prior_attempts(2),
            SharedEnv::default(),
            CollectingHandler::new(),
        );
        session.acknowledge_rules().unwrap();
        session.start().unwrap();
        session.force_end().unwrap();
        assert_eq!(session.result().unwrap().attempt_count, 3);
    }

    #[test]
    fn cancel_before_start() {
        let mut session = ProctoredSession::new(
            five_questions(),
            AttemptContext::new("c", "r"),
            SharedEnv::default(),
            CollectingHandler::new(),
        );
        session.acknowledge_rules().unwrap();
        assert_eq!(session.cancel().unwrap(), Transition::Finished);
        assert_eq!(session.phase(), SessionPhase::Cancelled);
        assert_eq!(session.handler().cancellations, 1);
        assert!(session.handler().results.is_empty());
        assert!(session.result().is_none());
        assert_eq!(session.cancel().unwrap(), Transition::Ignored);
    }

    #[test]
    fn cancel_in_progress_is_rejected() {
        let (mut session, _env) = started();
        assert!(session.cancel().is_err());
        assert_eq!(session.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn teardown_releases_resources() {
        let (session, env) = started();
        assert!(env.0.borrow().fullscreen);
        drop(session);
        assert!(env.0.borrow().subscribed.is_empty());
        assert!(!env.0.borrow().fullscreen);
    }

    #[test]
    fn open_unknown_test_is_a_configuration_error() {
        let catalog = TestCatalog::new();
        let err = TestSession::open(
            &catalog,
            "nope",
            AttemptContext::new("c", "r"),
            SharedEnv::default(),
            CollectingHandler::new(),
            SessionOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn progress_counts() {
        let (mut session, _env) = started();
        session.select_answer("q0", "a0").unwrap();
        session.select_answer("q3", "x").unwrap();
        let progress = session.progress();
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.unanswered, 3);
        assert_eq!(progress.percent, 40);
    }
}
