//! Persistence hooks for finished and interrupted sessions.
//!
//! The timer never persists its own state. What outlives it is the record
//! of what happened: completed phases for statistics and interruption notes.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::events::{CompletedSession, Interruption};

pub trait SessionRecorder {
    fn record_interruption(&mut self, interruption: &Interruption) -> Result<()>;

    fn record_completion(&mut self, session: &CompletedSession) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

impl SessionRecorder for NullRecorder {
    fn record_interruption(&mut self, _interruption: &Interruption) -> Result<()> {
        Ok(())
    }

    fn record_completion(&mut self, _session: &CompletedSession) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    interruptions: Vec<Interruption>,
    completions: Vec<CompletedSession>,
}

/// Keeps records in memory. Clones share the same storage, so a copy can
/// be handed to the scheduler while the original is inspected.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    inner: Arc<Mutex<Recorded>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interruptions(&self) -> Vec<Interruption> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interruptions
            .clone()
    }

    pub fn completions(&self) -> Vec<CompletedSession> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .completions
            .clone()
    }
}

impl SessionRecorder for MemoryRecorder {
    fn record_interruption(&mut self, interruption: &Interruption) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interruptions
            .push(interruption.clone());
        Ok(())
    }

    fn record_completion(&mut self, session: &CompletedSession) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .completions
            .push(session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, SessionId};
    use chrono::Utc;

    #[test]
    fn clones_share_records() {
        let recorder = MemoryRecorder::new();
        let mut handle = recorder.clone();
        handle
            .record_interruption(&Interruption {
                session_id: SessionId::new(),
                task_id: None,
                phase: Phase::Work,
                remaining_secs: 42,
                note: Some("doorbell".into()),
                at: Utc::now(),
            })
            .unwrap();
        assert_eq!(recorder.interruptions().len(), 1);
        assert!(recorder.completions().is_empty());
    }
}
