//! Proctoring monitor: listener/fullscreen ownership and violation escalation.
//!
//! Soft violations (tab switch, focus loss, fullscreen exit) share one
//! counter: every occurrence before the limit is a warning, the one that
//! reaches the limit ends the session. Hard violations (clipboard, context
//! menu, blocked shortcuts) end it on first occurrence.

use crate::error::EnvironmentError;
use crate::signal::{EnvironmentSignal, KeyBlocklist, Severity, SignalKind, Violation};
use crate::traits::ProctoringEnvironment;

/// Escalation settings.
#[derive(Debug, Clone)]
pub struct ProctoringPolicy {
    /// Soft violation count that terminates the session. Values below 1
    /// are treated as 1.
    pub soft_violation_limit: u32,
    pub blocklist: KeyBlocklist,
}

impl Default for ProctoringPolicy {
    fn default() -> Self {
        Self {
            soft_violation_limit: 2,
            blocklist: KeyBlocklist::default(),
        }
    }
}

/// What the monitor decided about a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not a violation, or the monitor is not engaged.
    Allow,
    /// Soft violation below the limit.
    Warn { warning_count: u32, message: String },
    /// The session must end with a zero score.
    Terminate {
        warning_count: u32,
        reason: String,
    },
}

#[derive(Debug)]
pub struct ProctoringMonitor {
    policy: ProctoringPolicy,
    warning_count: u32,
    subscribed: Vec<SignalKind>,
    fullscreen_held: bool,
}

impl ProctoringMonitor {
    pub fn new(policy: ProctoringPolicy) -> Self {
        Self {
            policy,
            warning_count: 0,
            subscribed: Vec::new(),
            fullscreen_held: false,
        }
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    /// Whether listeners are currently attached.
    pub fn is_engaged(&self) -> bool {
        !self.subscribed.is_empty()
    }

    pub fn holds_fullscreen(&self) -> bool {
        self.fullscreen_held
    }

    /// Attach every listener and enter fullscreen.
    ///
    /// A failed subscription releases whatever was already acquired and is
    /// returned. A refused fullscreen request is logged and tolerated.
    pub fn engage<E: ProctoringEnvironment + ?Sized>(
        &mut self,
        env: &mut E,
    ) -> Result<(), EnvironmentError> {
        for kind in SignalKind::ALL {
            if self.subscribed.contains(&kind) {
                continue;
            }
            if let Err(e) = env.subscribe(kind) {
                self.release(env);
                return Err(e);
            }
            self.subscribed.push(kind);
        }

        match env.request_fullscreen() {
            Ok(()) => self.fullscreen_held = true,
            Err(e) if e.is_recoverable() => {
                tracing::warn!("continuing without fullscreen: {e}");
            }
            Err(e) => {
                self.release(env);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Detach all listeners and leave fullscreen. Safe to call repeatedly.
    pub fn release<E: ProctoringEnvironment + ?Sized>(&mut self, env: &mut E) {
        for kind in self.subscribed.drain(..) {
            env.unsubscribe(kind);
        }
        if self.fullscreen_held {
            env.exit_fullscreen();
            self.fullscreen_held = false;
        }
    }

    /// Classify a signal and apply the escalation policy.
    pub fn assess(&mut self, signal: &EnvironmentSignal) -> Verdict {
        if !self.subscribed.contains(&signal.kind()) {
            return Verdict::Allow;
        }
        let Some(Violation { kind, severity }) = signal.classify(&self.policy.blocklist) else {
            return Verdict::Allow;
        };

        match severity {
            Severity::Hard => Verdict::Terminate {
                warning_count: self.warning_count,
                reason: format!("Test terminated: {kind} is not allowed during the test"),
            },
            Severity::Soft => {
                self.warning_count += 1;
                let limit = self.policy.soft_violation_limit.max(1);
                if self.warning_count >= limit {
                    Verdict::Terminate {
                        warning_count: self.warning_count,
                        reason: format!(
                            "Test terminated: {kind} detected after {} warning(s)",
                            self.warning_count - 1
                        ),
                    }
                } else {
                    let remaining = limit - self.warning_count;
                    Verdict::Warn {
                        warning_count: self.warning_count,
                        message: format!(
                            "Warning: {kind} is not allowed. {remaining} more violation(s) will end the test."
                        ),
                    }
                }
            }
        }
    }
}
