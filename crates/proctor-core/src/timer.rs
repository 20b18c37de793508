//! Countdown clock with one-second resolution.
//!
//! The timer does not own a task; whoever drives the session feeds it one
//! tick per elapsed second (see [`crate::driver`]). Ticks while stopped are
//! ignored, so a finished session can never be re-submitted by a late tick.

use serde::{Deserialize, Serialize};

/// Remaining-time bands used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUrgency {
    Normal,
    Warning,
    Critical,
}

/// Thresholds below which the clock is shown as warning / critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyThresholds {
    pub warning_below_secs: u32,
    pub critical_below_secs: u32,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            warning_below_secs: 60,
            critical_below_secs: 30,
        }
    }
}

impl UrgencyThresholds {
    pub fn classify(&self, remaining_secs: u32) -> TimeUrgency {
        if remaining_secs < self.critical_below_secs {
            TimeUrgency::Critical
        } else if remaining_secs < self.warning_below_secs {
            TimeUrgency::Warning
        } else {
            TimeUrgency::Normal
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// The timer is not running.
    Idle,
    /// One second elapsed; this many remain.
    Running { remaining_secs: u32 },
    /// The countdown reached zero on this tick. The timer is now stopped.
    Expired,
}

#[derive(Debug, Clone)]
pub struct CountdownTimer {
    remaining_secs: u32,
    running: bool,
    thresholds: UrgencyThresholds,
}

impl CountdownTimer {
    pub fn new(total_secs: u32) -> Self {
        Self {
            remaining_secs: total_secs,
            running: false,
            thresholds: UrgencyThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: UrgencyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn urgency(&self) -> TimeUrgency {
        self.thresholds.classify(self.remaining_secs)
    }

    /// Advance the clock by one second.
    pub fn tick(&mut self) -> TimerTick {
        if !self.running {
            return TimerTick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            TimerTick::Expired
        } else {
            TimerTick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let mut timer = CountdownTimer::new(3);
        assert_eq!(timer.tick(), TimerTick::Idle);

        timer.start();
        assert_eq!(timer.tick(), TimerTick::Running { remaining_secs: 2 });
        assert_eq!(timer.tick(), TimerTick::Running { remaining_secs: 1 });
        assert_eq!(timer.tick(), TimerTick::Expired);
        assert!(!timer.is_running());
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[test]
    fn zero_length_expires_on_first_tick() {
        let mut timer = CountdownTimer::new(0);
        timer.start();
        assert_eq!(timer.tick(), TimerTick::Expired);
    }

    #[test]
    fn stopped_timer_keeps_its_value() {
        let mut timer = CountdownTimer::new(10);
        timer.start();
        timer.tick();
        timer.stop();
        assert_eq!(timer.tick(), TimerTick::Idle);
        assert_eq!(timer.remaining_secs(), 9);
    }

    #[test]
    fn urgency_bands() {
        let t = UrgencyThresholds::default();
        assert_eq!(t.classify(900), TimeUrgency::Normal);
        assert_eq!(t.classify(60), TimeUrgency::Normal);
        assert_eq!(t.classify(59), TimeUrgency::Warning);
        assert_eq!(t.classify(30), TimeUrgency::Warning);
        assert_eq!(t.classify(29), TimeUrgency::Critical);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(900), "15:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(0), "00:00");
    }
}
