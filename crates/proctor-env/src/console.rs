//! Terminal environment: writes proctoring notices to a text sink.

use std::collections::BTreeSet;
use std::io::{self, Write};

use proctor_core::error::EnvironmentError;
use proctor_core::signal::SignalKind;
use proctor_core::traits::ProctoringEnvironment;

/// Environment for interactive terminal sessions.
///
/// A terminal has no real fullscreen mode or focus events, so the
/// capabilities are emulated as notices on the sink and the signals
/// themselves arrive from the session script.
pub struct ConsoleEnvironment<W: Write = io::Stderr> {
    out: W,
    active: BTreeSet<SignalKind>,
    fullscreen: bool,
}

impl ConsoleEnvironment<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ConsoleEnvironment<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            active: BTreeSet::new(),
            fullscreen: false,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn notice(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::debug!("console notice dropped: {e}");
        }
    }
}

impl<W: Write> ProctoringEnvironment for ConsoleEnvironment<W> {
    fn subscribe(&mut self, kind: SignalKind) -> Result<(), EnvironmentError> {
        if self.active.insert(kind) {
            tracing::debug!("monitoring {kind} signals");
        }
        Ok(())
    }

    fn unsubscribe(&mut self, kind: SignalKind) {
        if self.active.remove(&kind) {
            tracing::debug!("stopped monitoring {kind} signals");
        }
    }

    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError> {
        if !self.fullscreen {
            self.fullscreen = true;
            self.notice("[proctor] Test started. Proctoring is active until you submit.");
        }
        Ok(())
    }

    fn exit_fullscreen(&mut self) {
        if self.fullscreen {
            self.fullscreen = false;
            self.notice("[proctor] Proctoring ended.");
        }
    }

    fn show_warning(&mut self, message: &str) {
        self.notice(&format!("[proctor] {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_notices_and_warnings() {
        let mut env = ConsoleEnvironment::new(Vec::new());
        for kind in SignalKind::ALL {
            env.subscribe(kind).unwrap();
        }
        env.request_fullscreen().unwrap();
        env.request_fullscreen().unwrap();
        env.show_warning("Warning: switching tabs is not allowed.");
        env.exit_fullscreen();
        env.exit_fullscreen();
        assert!(env.is_monitoring());
        for kind in SignalKind::ALL {
            env.unsubscribe(kind);
        }
        assert!(!env.is_monitoring());

        let text = String::from_utf8(env.into_inner()).unwrap();
        assert_eq!(text.matches("Proctoring is active").count(), 1);
        assert_eq!(text.matches("Proctoring ended").count(), 1);
        assert!(text.contains("[proctor] Warning: switching tabs"));
    }
}
