//! User-facing feedback on timer transitions.
//!
//! Hosts decide how to deliver feedback (vibration motor, notification,
//! terminal bell). The core only decides when and which pattern.

use serde::Serialize;

use crate::events::Event;
use crate::timer::Phase;

/// Vibration pattern as alternating on/off durations in milliseconds,
/// starting with "on".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HapticPattern {
    pub name: &'static str,
    pub timings_ms: Vec<u32>,
}

impl HapticPattern {
    pub fn work_complete() -> Self {
        Self {
            name: "work_complete",
            timings_ms: vec![600, 200, 600],
        }
    }

    pub fn break_complete() -> Self {
        Self {
            name: "break_complete",
            timings_ms: vec![150, 100, 150, 100, 150],
        }
    }

    pub fn long_break_start() -> Self {
        Self {
            name: "long_break_start",
            timings_ms: vec![1000],
        }
    }

    /// Number of "on" pulses.
    pub fn pulses(&self) -> usize {
        self.timings_ms.len().div_ceil(2)
    }

    pub fn total_ms(&self) -> u32 {
        self.timings_ms.iter().sum()
    }
}

/// Pattern to play for `event`, if it warrants one.
///
/// Only natural completions vibrate; skipping is the user's own action.
pub fn pattern_for(event: &Event) -> Option<HapticPattern> {
    match event {
        Event::PhaseCompleted {
            skipped: false,
            completed: Phase::Work,
            next: Phase::LongBreak,
            ..
        } => Some(HapticPattern::long_break_start()),
        Event::PhaseCompleted {
            skipped: false,
            completed: Phase::Work,
            ..
        } => Some(HapticPattern::work_complete()),
        Event::PhaseCompleted {
            skipped: false,
            completed: Phase::ShortBreak | Phase::LongBreak,
            ..
        } => Some(HapticPattern::break_complete()),
        _ => None,
    }
}

/// Receives every transition event the scheduler produces. Ticks go to
/// subscribers only.
pub trait Feedback {
    fn on_event(&mut self, event: &Event);
}

/// Feedback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn on_event(&mut self, _event: &Event) {}
}

impl<F: FnMut(&Event)> Feedback for F {
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SessionId;
    use chrono::Utc;

    fn completed(completed: Phase, next: Phase, skipped: bool) -> Event {
        Event::PhaseCompleted {
            session_id: SessionId::new(),
            completed,
            task_id: None,
            elapsed_secs: 1,
            skipped,
            next,
            next_session_id: None,
            next_duration_secs: 0,
            session_count: 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn work_into_short_break_pulses_twice() {
        let p = pattern_for(&completed(Phase::Work, Phase::ShortBreak, false)).unwrap();
        assert_eq!(p, HapticPattern::work_complete());
        assert_eq!(p.pulses(), 2);
    }

    #[test]
    fn work_into_long_break_has_its_own_pattern() {
        let p = pattern_for(&completed(Phase::Work, Phase::LongBreak, false)).unwrap();
        assert_eq!(p.name, "long_break_start");
    }

    #[test]
    fn break_completion_pulses_three_times() {
        let p = pattern_for(&completed(Phase::ShortBreak, Phase::Idle, false)).unwrap();
        assert_eq!(p.pulses(), 3);
        assert_eq!(p.total_ms(), 650);
    }

    #[test]
    fn skips_and_other_events_are_silent() {
        assert!(pattern_for(&completed(Phase::Work, Phase::ShortBreak, true)).is_none());
        assert!(pattern_for(&Event::Reset { at: Utc::now() }).is_none());
    }

    #[test]
    fn closures_are_feedback() {
        let mut seen = 0;
        {
            let mut fb = |_: &Event| seen += 1;
            fb.on_event(&Event::Reset { at: Utc::now() });
        }
        assert_eq!(seen, 1);
    }
}
