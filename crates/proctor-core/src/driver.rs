//! Async driver: feeds a session from an event stream and a one-second clock.
//!
//! The clock only exists while the session is in progress. It is created when
//! the session starts and dropped as soon as it finishes, so no tick is ever
//! delivered to a finished session.

use std::pin::pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::error::SessionError;
use crate::model::TestResult;
use crate::session::{ProctoredSession, SessionEvent, SessionPhase, Transition};
use crate::timer::TimeUrgency;
use crate::traits::{ProctoringEnvironment, SessionHandler};

/// Callbacks for a front end that wants to render while a session runs.
pub trait DriveObserver {
    fn on_event(&self, _event: &SessionEvent, _transition: Transition) {}
    fn on_rejected(&self, _event: &SessionEvent, _error: &SessionError) {}
    fn on_tick(&self, _remaining_secs: u32, _urgency: TimeUrgency) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl DriveObserver for NoopObserver {}

/// An event the session refused, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEvent {
    pub event: SessionEvent,
    pub error: String,
}

/// Summary of one driven session.
#[derive(Debug, Clone)]
pub struct DriveReport {
    pub phase: SessionPhase,
    pub result: Option<TestResult>,
    /// Events that changed state, excluding clock ticks.
    pub applied: usize,
    pub ticks: u32,
    pub rejected: Vec<RejectedEvent>,
}

/// Run `session` until it finishes or there is nothing left to wait for.
///
/// Events are applied in arrival order. While the session is in progress a
/// `Tick` is injected every `tick` interval. The driver returns when the
/// session reaches a terminal phase, or when the event stream is exhausted
/// and no countdown is running.
pub async fn drive<E, H, S>(
    session: &mut ProctoredSession<E, H>,
    events: S,
    tick: Duration,
    observer: &dyn DriveObserver,
) -> DriveReport
where
    E: ProctoringEnvironment,
    H: SessionHandler,
    S: Stream<Item = SessionEvent>,
{
    let mut events = pin!(events);
    let mut events_done = false;
    let mut clock: Option<Interval> = None;
    let mut report = DriveReport {
        phase: session.phase(),
        result: None,
        applied: 0,
        ticks: 0,
        rejected: Vec::new(),
    };

    while !session.is_finished() {
        if session.timer_running() {
            if clock.is_none() {
                let mut interval = time::interval_at(Instant::now() + tick, tick);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                clock = Some(interval);
            }
        } else {
            clock = None;
            if events_done {
                break;
            }
        }

        tokio::select! {
            next = events.next(), if !events_done => match next {
                Some(event) => apply(session, event, observer, &mut report),
                None => {
                    tracing::debug!(session = %session.id(), "event stream exhausted");
                    events_done = true;
                }
            },
            _ = next_tick(&mut clock) => {
                match session.tick() {
                    Ok(Transition::Ignored) => {}
                    Ok(_) => {
                        report.ticks += 1;
                        observer.on_tick(session.state().time_left_seconds, session.urgency());
                    }
                    Err(e) => tracing::warn!("clock tick rejected: {e}"),
                }
            }
        }
    }

    if !session.is_finished() {
        tracing::info!(
            session = %session.id(),
            phase = %session.phase(),
            "event stream ended before the session finished"
        );
    }

    report.phase = session.phase();
    report.result = session.result().cloned();
    report
}

fn apply<E, H>(
    session: &mut ProctoredSession<E, H>,
    event: SessionEvent,
    observer: &dyn DriveObserver,
    report: &mut DriveReport,
) where
    E: ProctoringEnvironment,
    H: SessionHandler,
{
    match session.dispatch(event.clone()) {
        Ok(transition) => {
            if transition != Transition::Ignored {
                report.applied += 1;
            }
            observer.on_event(&event, transition);
        }
        Err(e) => {
            tracing::warn!(session = %session.id(), "rejected {event:?}: {e}");
            observer.on_rejected(&event, &e);
            report.rejected.push(RejectedEvent {
                event,
                error: e.to_string(),
            });
        }
    }
}

/// Wait for the next clock tick, or forever when there is no clock.
async fn next_tick(clock: &mut Option<Interval>) {
    match clock {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
