//! Session policy: what follows a finished phase.
//!
//! The policy is a pure function of the finished phase, the cycle count and
//! whether a task is attached. The break kind is decided here and carried
//! on the phase itself, so nothing downstream has to guess it from the
//! remaining time.

use serde::{Deserialize, Serialize};

use super::settings::PomodoroSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Work,
    ShortBreak,
    LongBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn break_kind(self) -> Option<BreakKind> {
        match self {
            Phase::ShortBreak => Some(BreakKind::Short),
            Phase::LongBreak => Some(BreakKind::Long),
            Phase::Work | Phase::Idle => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Work => "Work",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Phase::Idle),
            "work" => Some(Phase::Work),
            "short_break" => Some(Phase::ShortBreak),
            "long_break" => Some(Phase::LongBreak),
            _ => None,
        }
    }
}

/// Outcome of a finished phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub phase: Phase,
    /// Countdown for the next phase; 0 when going idle.
    pub duration_secs: u32,
    /// Work sessions completed in the cycle after this transition.
    pub session_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy<'a> {
    settings: &'a PomodoroSettings,
}

impl<'a> SessionPolicy<'a> {
    pub fn new(settings: &'a PomodoroSettings) -> Self {
        Self { settings }
    }

    /// Countdown length for `phase` in seconds.
    pub fn duration_secs(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.settings.work_secs(),
            Phase::ShortBreak => self.settings.short_break_secs(),
            Phase::LongBreak => self.settings.long_break_secs(),
            Phase::Idle => 0,
        }
    }

    /// Break that follows a work session when `count` work sessions were
    /// already completed in this cycle.
    pub fn break_after_work(&self, count: u32) -> Phase {
        if count.saturating_add(1) >= self.settings.sessions_until_long_break {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }

    /// Decide the phase that follows `finished`.
    pub fn next(&self, finished: Phase, count: u32, has_task: bool) -> Decision {
        match finished {
            Phase::Work => {
                let phase = self.break_after_work(count);
                Decision {
                    phase,
                    duration_secs: self.duration_secs(phase),
                    session_count: count.saturating_add(1),
                }
            }
            Phase::ShortBreak | Phase::LongBreak => {
                let session_count = if finished == Phase::LongBreak { 0 } else { count };
                if self.settings.auto_start_next_session && has_task {
                    Decision {
                        phase: Phase::Work,
                        duration_secs: self.duration_secs(Phase::Work),
                        session_count,
                    }
                } else {
                    Decision {
                        phase: Phase::Idle,
                        duration_secs: 0,
                        session_count,
                    }
                }
            }
            Phase::Idle => Decision {
                phase: Phase::Idle,
                duration_secs: 0,
                session_count: count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(auto: bool) -> PomodoroSettings {
        PomodoroSettings {
            auto_start_next_session: auto,
            ..Default::default()
        }
    }

    #[test]
    fn work_leads_to_short_break_below_threshold() {
        let s = settings(false);
        let d = SessionPolicy::new(&s).next(Phase::Work, 0, true);
        assert_eq!(d.phase, Phase::ShortBreak);
        assert_eq!(d.duration_secs, 300);
        assert_eq!(d.session_count, 1);
    }

    #[test]
    fn fourth_work_session_leads_to_long_break() {
        let s = settings(false);
        let d = SessionPolicy::new(&s).next(Phase::Work, 3, true);
        assert_eq!(d.phase, Phase::LongBreak);
        assert_eq!(d.duration_secs, 900);
        assert_eq!(d.session_count, 4);
    }

    #[test]
    fn threshold_of_one_always_long() {
        let s = PomodoroSettings {
            sessions_until_long_break: 1,
            ..Default::default()
        };
        let p = SessionPolicy::new(&s);
        assert_eq!(p.break_after_work(0), Phase::LongBreak);
    }

    #[test]
    fn long_break_completion_resets_count() {
        let s = settings(false);
        let d = SessionPolicy::new(&s).next(Phase::LongBreak, 4, true);
        assert_eq!(d.phase, Phase::Idle);
        assert_eq!(d.session_count, 0);
    }

    #[test]
    fn short_break_keeps_count() {
        let s = settings(true);
        let d = SessionPolicy::new(&s).next(Phase::ShortBreak, 2, true);
        assert_eq!(d.phase, Phase::Work);
        assert_eq!(d.duration_secs, 1500);
        assert_eq!(d.session_count, 2);
    }

    #[test]
    fn auto_start_requires_task() {
        let s = settings(true);
        let d = SessionPolicy::new(&s).next(Phase::ShortBreak, 1, false);
        assert_eq!(d.phase, Phase::Idle);
    }

    #[test]
    fn equal_break_durations_still_classified() {
        let s = PomodoroSettings {
            short_break_duration: 10,
            long_break_duration: 10,
            ..Default::default()
        };
        let p = SessionPolicy::new(&s);
        assert_eq!(p.break_after_work(3).break_kind(), Some(BreakKind::Long));
        assert_eq!(p.break_after_work(0).break_kind(), Some(BreakKind::Short));
    }

    #[test]
    fn phase_names_round_trip() {
        for phase in [Phase::Idle, Phase::Work, Phase::ShortBreak, Phase::LongBreak] {
            assert_eq!(Phase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(Phase::parse("nap"), None);
    }
}
