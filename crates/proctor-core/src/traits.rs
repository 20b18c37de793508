//! Core trait definitions for the proctoring environment and the caller's
//! completion handler.
//!
//! The session controller depends only on these traits, never on a concrete
//! browser or terminal. `proctor-env` provides the implementations.

use crate::error::EnvironmentError;
use crate::model::TestResult;
use crate::signal::SignalKind;

// ---------------------------------------------------------------------------
// Proctoring environment
// ---------------------------------------------------------------------------

/// Capability interface over the environment a session runs in.
///
/// Signals themselves are delivered to the session as events; subscribing
/// tells the environment which channels to forward.
pub trait ProctoringEnvironment {
    /// Start forwarding signals of `kind`.
    fn subscribe(&mut self, kind: SignalKind) -> Result<(), EnvironmentError>;

    /// Stop forwarding signals of `kind`. Unsubscribing an inactive channel
    /// is a no-op.
    fn unsubscribe(&mut self, kind: SignalKind);

    /// Enter fullscreen mode.
    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError>;

    /// Leave fullscreen mode if it is active.
    fn exit_fullscreen(&mut self);

    /// Show a non-blocking warning to the candidate.
    fn show_warning(&mut self, message: &str);
}

impl<E: ProctoringEnvironment + ?Sized> ProctoringEnvironment for Box<E> {
    fn subscribe(&mut self, kind: SignalKind) -> Result<(), EnvironmentError> {
        (**self).subscribe(kind)
    }

    fn unsubscribe(&mut self, kind: SignalKind) {
        (**self).unsubscribe(kind)
    }

    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError> {
        (**self).request_fullscreen()
    }

    fn exit_fullscreen(&mut self) {
        (**self).exit_fullscreen()
    }

    fn show_warning(&mut self, message: &str) {
        (**self).show_warning(message)
    }
}

// ---------------------------------------------------------------------------
// Completion handler
// ---------------------------------------------------------------------------

/// Receives the outcome of a session. Each method is called at most once per
/// session, and never both.
pub trait SessionHandler {
    /// The attempt finished; ownership of the result passes to the caller.
    fn on_complete(&mut self, result: TestResult);

    /// The candidate backed out before starting.
    fn on_cancel(&mut self) {}
}

impl<H: SessionHandler + ?Sized> SessionHandler for Box<H> {
    fn on_complete(&mut self, result: TestResult) {
        (**self).on_complete(result)
    }

    fn on_cancel(&mut self) {
        (**self).on_cancel()
    }
}

/// Handler that keeps what it receives.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub results: Vec<TestResult>,
    pub cancellations: u32,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent result, if any.
    pub fn last(&self) -> Option<&TestResult> {
        self.results.last()
    }
}

impl SessionHandler for CollectingHandler {
    fn on_complete(&mut self, result: TestResult) {
        self.results.push(result);
    }

    fn on_cancel(&mut self) {
        self.cancellations += 1;
    }
}

/// Handler that discards everything.
pub struct NoopHandler;

impl SessionHandler for NoopHandler {
    fn on_complete(&mut self, _: TestResult) {}
}
