//! Recording environment for tests and headless runs.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use proctor_core::error::EnvironmentError;
use proctor_core::signal::SignalKind;
use proctor_core::traits::ProctoringEnvironment;

#[derive(Debug, Default)]
struct Recording {
    subscribed: BTreeSet<SignalKind>,
    fullscreen: bool,
    warnings: Vec<String>,
    subscribe_calls: u32,
    fullscreen_requests: u32,
    deny_fullscreen: bool,
    fail_on: Option<SignalKind>,
}

/// An environment that only records what the session asked of it.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another and inspect the environment after the session is dropped.
#[derive(Debug, Clone, Default)]
pub struct RecordingEnvironment {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every fullscreen request.
    pub fn denying_fullscreen(self) -> Self {
        self.lock().deny_fullscreen = true;
        self
    }

    /// Fail when the session subscribes to `kind`.
    pub fn failing_on(self, kind: SignalKind) -> Self {
        self.lock().fail_on = Some(kind);
        self
    }

    pub fn subscribed(&self) -> Vec<SignalKind> {
        self.lock().subscribed.iter().copied().collect()
    }

    pub fn is_subscribed(&self, kind: SignalKind) -> bool {
        self.lock().subscribed.contains(&kind)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.lock().fullscreen
    }

    /// Warnings shown so far, oldest first.
    pub fn warnings(&self) -> Vec<String> {
        self.lock().warnings.clone()
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.lock().subscribe_calls
    }

    pub fn fullscreen_requests(&self) -> u32 {
        self.lock().fullscreen_requests
    }

    /// No listener attached and not in fullscreen.
    pub fn is_released(&self) -> bool {
        let rec = self.lock();
        rec.subscribed.is_empty() && !rec.fullscreen
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProctoringEnvironment for RecordingEnvironment {
    fn subscribe(&mut self, kind: SignalKind) -> Result<(), EnvironmentError> {
        let mut rec = self.lock();
        rec.subscribe_calls += 1;
        if rec.fail_on == Some(kind) {
            return Err(EnvironmentError::SubscriptionFailed {
                kind,
                reason: "injected failure".into(),
            });
        }
        rec.subscribed.insert(kind);
        Ok(())
    }

    fn unsubscribe(&mut self, kind: SignalKind) {
        self.lock().subscribed.remove(&kind);
    }

    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError> {
        let mut rec = self.lock();
        rec.fullscreen_requests += 1;
        if rec.deny_fullscreen {
            return Err(EnvironmentError::FullscreenDenied(
                "fullscreen is disabled for this environment".into(),
            ));
        }
        rec.fullscreen = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) {
        self.lock().fullscreen = false;
    }

    fn show_warning(&mut self, message: &str) {
        tracing::debug!("warning shown: {message}");
        self.lock().warnings.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proctor_core::history::AttemptContext;
    use proctor_core::model::{Question, QuestionKind, TestDefinition};
    use proctor_core::session::{ProctoredSession, SessionPhase};
    use proctor_core::signal::EnvironmentSignal;
    use proctor_core::traits::CollectingHandler;

    use super::*;

    fn one_question() -> Arc<TestDefinition> {
        Arc::new(TestDefinition {
            id: "t".into(),
            title: "T".into(),
            description: String::new(),
            questions: vec![Question {
                id: "q".into(),
                question: "?".into(),
                kind: QuestionKind::TrueFalse,
                options: vec![],
                correct_answer: "true".into(),
                points: 10,
            }],
            time_limit_minutes: 5,
            passing_score_percent: 80,
            max_attempts: 3,
        })
    }

    fn start(env: RecordingEnvironment) -> ProctoredSession<RecordingEnvironment, CollectingHandler> {
        let mut session = ProctoredSession::new(
            one_question(),
            AttemptContext::new("c", "r"),
            env,
            CollectingHandler::new(),
        );
        session.acknowledge_rules().unwrap();
        session
    }

    #[test]
    fn tracks_subscriptions_across_the_lifecycle() {
        let env = RecordingEnvironment::new();
        let mut session = start(env.clone());
        session.start().unwrap();
        assert_eq!(env.subscribed().len(), SignalKind::ALL.len());
        assert!(env.is_fullscreen());

        session
            .handle_signal(EnvironmentSignal::VisibilityChanged { hidden: true })
            .unwrap();
        assert_eq!(env.warnings().len(), 1);

        session.select_answer("q", true).unwrap();
        session.submit().unwrap();
        assert!(env.is_released());
    }

    #[test]
    fn subscription_failure_aborts_start() {
        let env = RecordingEnvironment::new().failing_on(SignalKind::Keyboard);
        let mut session = start(env.clone());
        assert!(session.start().is_err());
        assert_eq!(session.phase(), SessionPhase::RulesAcknowledged);
        assert!(env.is_released());
        assert!(env.subscribe_calls() > 0);
    }

    #[test]
    fn denied_fullscreen_still_starts() {
        let env = RecordingEnvironment::new().denying_fullscreen();
        let mut session = start(env.clone());
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert_eq!(env.fullscreen_requests(), 1);
        assert!(!env.is_fullscreen());
        drop(session);
        assert!(env.is_released());
    }
}
