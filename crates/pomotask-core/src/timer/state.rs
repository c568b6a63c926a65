use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::policy::{BreakKind, Phase};

/// Identifies one work or break session while it is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Countdown state. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroState {
    pub active: bool,
    pub phase: Phase,
    /// Seconds left in the current phase.
    pub time_remaining: u32,
    /// Full length of the current phase in seconds.
    pub phase_duration: u32,
    /// Work sessions completed in the current cycle.
    pub current_session_count: u32,
    pub session_id: Option<SessionId>,
    pub task_id: Option<String>,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self {
            active: false,
            phase: Phase::Idle,
            time_remaining: 0,
            phase_duration: 0,
            current_session_count: 0,
            session_id: None,
            task_id: None,
        }
    }
}

impl PomodoroState {
    pub fn is_break(&self) -> bool {
        self.phase.is_break()
    }

    pub fn break_kind(&self) -> Option<BreakKind> {
        self.phase.break_kind()
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.phase_duration.saturating_sub(self.time_remaining)
    }
}

/// Point-in-time view of the timer for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub active: bool,
    pub is_break: bool,
    pub break_kind: Option<BreakKind>,
    pub phase: Phase,
    pub time_remaining: u32,
    pub phase_duration: u32,
    pub current_session_count: u32,
    pub sessions_until_long_break: u32,
    pub session_id: Option<SessionId>,
    pub task_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl Snapshot {
    /// `MM:SS` rendering of the remaining time.
    pub fn clock(&self) -> String {
        format_clock(self.time_remaining)
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        let s = PomodoroState::default();
        assert!(!s.active);
        assert!(!s.is_break());
        assert_eq!(s.phase, Phase::Idle);
        assert!(s.session_id.is_none());
    }

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn session_ids_parse_back() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
