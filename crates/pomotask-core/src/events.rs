use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, SessionId};

/// Every state change of the timer produces an Event.
/// The host renders them; feedback and recorders subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: SessionId,
        phase: Phase,
        task_id: Option<String>,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// One second elapsed on a running countdown.
    Tick {
        session_id: SessionId,
        phase: Phase,
        remaining_secs: u32,
    },
    Paused {
        session_id: SessionId,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    Resumed {
        session_id: SessionId,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// A phase ran out (or was skipped) and the policy picked the next one.
    PhaseCompleted {
        session_id: SessionId,
        completed: Phase,
        task_id: Option<String>,
        /// Seconds actually spent in the finished phase.
        elapsed_secs: u32,
        skipped: bool,
        next: Phase,
        next_session_id: Option<SessionId>,
        next_duration_secs: u32,
        session_count: u32,
        at: DateTime<Utc>,
    },
    Stopped {
        session_id: Option<SessionId>,
        interruption: Option<Interruption>,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
}

/// A session ended early by the user, with an optional reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    pub session_id: SessionId,
    pub task_id: Option<String>,
    pub phase: Phase,
    pub remaining_secs: u32,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// A finished phase as stored for statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub session_id: SessionId,
    pub task_id: Option<String>,
    pub phase: Phase,
    pub duration_secs: u32,
    pub skipped: bool,
    pub completed_at: DateTime<Utc>,
}

impl Event {
    /// Completion record for `PhaseCompleted`, `None` for everything else.
    pub fn completed_session(&self) -> Option<CompletedSession> {
        match self {
            Event::PhaseCompleted {
                session_id,
                completed,
                task_id,
                elapsed_secs,
                skipped,
                at,
                ..
            } => Some(CompletedSession {
                session_id: *session_id,
                task_id: task_id.clone(),
                phase: *completed,
                duration_secs: *elapsed_secs,
                skipped: *skipped,
                completed_at: *at,
            }),
            _ => None,
        }
    }

    pub fn interruption(&self) -> Option<&Interruption> {
        match self {
            Event::Stopped { interruption, .. } => interruption.as_ref(),
            _ => None,
        }
    }

    /// Ticks are high-volume; hosts usually render them differently.
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::Tick { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::Reset { at: Utc::now() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reset");
    }

    #[test]
    fn completion_converts_to_record() {
        let session_id = SessionId::new();
        let event = Event::PhaseCompleted {
            session_id,
            completed: Phase::Work,
            task_id: Some("t1".into()),
            elapsed_secs: 1500,
            skipped: false,
            next: Phase::ShortBreak,
            next_session_id: Some(SessionId::new()),
            next_duration_secs: 300,
            session_count: 1,
            at: Utc::now(),
        };
        let record = event.completed_session().unwrap();
        assert_eq!(record.session_id, session_id);
        assert_eq!(record.phase, Phase::Work);
        assert_eq!(record.duration_secs, 1500);
        assert!(event.interruption().is_none());
    }
}
