//! Timer engine implementation.
//!
//! The engine is a tick-driven state machine. It does not own a clock or a
//! thread: the caller invokes `tick()` once per second while the countdown
//! is active (see [`super::driver`] for the scheduler that does this).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Work -> ShortBreak -> Work -> ... -> LongBreak -> (Work | Idle)
//!           \-> pause/resume keep the session, stop returns to Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(PomodoroSettings::default());
//! engine.start(Some("task-1".into()), &NoTasks)?;
//! // Once per second:
//! engine.tick(); // Returns Some(Event::PhaseCompleted) when a phase ends
//! ```

use chrono::Utc;
use tracing::{debug, info};

use super::policy::{Phase, SessionPolicy};
use super::settings::PomodoroSettings;
use super::state::{PomodoroState, SessionId, Snapshot};
use crate::error::TimerError;
use crate::events::{Event, Interruption};
use crate::task::TaskSource;

/// Core timer engine.
#[derive(Debug, Clone, Default)]
pub struct TimerEngine {
    settings: PomodoroSettings,
    state: PomodoroState,
}

impl TimerEngine {
    /// Create an idle engine with the given settings.
    pub fn new(settings: PomodoroSettings) -> Self {
        Self {
            settings,
            state: PomodoroState::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn state(&self) -> &PomodoroState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session_id
    }

    pub fn current_session_count(&self) -> u32 {
        self.state.current_session_count
    }

    pub fn task_id(&self) -> Option<&str> {
        self.state.task_id.as_deref()
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.state.phase_duration == 0 {
            return 0.0;
        }
        f64::from(self.state.elapsed_secs()) / f64::from(self.state.phase_duration)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            active: self.state.active,
            is_break: self.state.is_break(),
            break_kind: self.state.break_kind(),
            phase: self.state.phase,
            time_remaining: self.state.time_remaining,
            phase_duration: self.state.phase_duration,
            current_session_count: self.state.current_session_count,
            sessions_until_long_break: self.settings.sessions_until_long_break,
            session_id: self.state.session_id,
            task_id: self.state.task_id.clone(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a work session.
    ///
    /// Uses `task_id` when given, otherwise the first task `tasks` offers.
    /// Replaces any session already in progress.
    pub fn start<T>(&mut self, task_id: Option<String>, tasks: &T) -> Result<Event, TimerError>
    where
        T: TaskSource + ?Sized,
    {
        let task_id = task_id
            .or_else(|| tasks.first_available())
            .ok_or(TimerError::NoTaskSelected)?;
        if let Some(previous) = self.state.session_id {
            debug!(%previous, "replacing session in progress");
        }
        self.state.task_id = Some(task_id);
        let duration = SessionPolicy::new(&self.settings).duration_secs(Phase::Work);
        let session_id = self.begin(Phase::Work, duration);
        info!(%session_id, task_id = ?self.state.task_id, "work session started");
        Ok(Event::SessionStarted {
            session_id,
            phase: Phase::Work,
            task_id: self.state.task_id.clone(),
            duration_secs: duration,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Result<Event, TimerError> {
        let session_id = match (self.state.active, self.state.session_id) {
            (true, Some(id)) => id,
            _ => return Err(TimerError::NotRunning),
        };
        self.state.active = false;
        Ok(Event::Paused {
            session_id,
            remaining_secs: self.state.time_remaining,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Result<Event, TimerError> {
        let session_id = self.state.session_id.ok_or(TimerError::NoActiveSession)?;
        if self.state.active {
            return Err(TimerError::AlreadyRunning);
        }
        self.state.active = true;
        Ok(Event::Resumed {
            session_id,
            remaining_secs: self.state.time_remaining,
            at: Utc::now(),
        })
    }

    /// End the current session and go idle.
    ///
    /// With `record_interruption`, the returned event carries an
    /// [`Interruption`] for whatever session was in progress.
    pub fn stop(&mut self, record_interruption: bool, note: Option<String>) -> Event {
        let session_id = self.state.session_id;
        let interruption = match session_id {
            Some(id) if record_interruption => Some(Interruption {
                session_id: id,
                task_id: self.state.task_id.clone(),
                phase: self.state.phase,
                remaining_secs: self.state.time_remaining,
                note: note.filter(|n| !n.trim().is_empty()),
                at: Utc::now(),
            }),
            _ => None,
        };
        self.go_idle();
        Event::Stopped {
            session_id,
            interruption,
            at: Utc::now(),
        }
    }

    /// Finish the current phase now and move on as if it ran out.
    pub fn skip(&mut self) -> Result<Event, TimerError> {
        if self.state.session_id.is_none() {
            return Err(TimerError::NoActiveSession);
        }
        Ok(self.finish(true))
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::PhaseCompleted)` when the phase ends.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.active {
            return None;
        }
        if self.state.time_remaining <= 1 {
            self.state.time_remaining = 0;
            return Some(self.finish(false));
        }
        self.state.time_remaining -= 1;
        None
    }

    /// Back to a fresh idle engine. The cycle count and selected task are
    /// cleared as well.
    pub fn reset(&mut self) -> Event {
        self.state = PomodoroState::default();
        Event::Reset { at: Utc::now() }
    }

    /// Replace the settings. A running countdown keeps its length; the new
    /// values apply from the next transition.
    pub fn set_settings(&mut self, settings: PomodoroSettings) {
        self.settings = settings;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self, phase: Phase, duration_secs: u32) -> SessionId {
        let session_id = SessionId::new();
        self.state.active = true;
        self.state.phase = phase;
        self.state.time_remaining = duration_secs;
        self.state.phase_duration = duration_secs;
        self.state.session_id = Some(session_id);
        session_id
    }

    fn go_idle(&mut self) {
        self.state.active = false;
        self.state.phase = Phase::Idle;
        self.state.time_remaining = 0;
        self.state.phase_duration = 0;
        self.state.session_id = None;
    }

    fn finish(&mut self, skipped: bool) -> Event {
        let completed = self.state.phase;
        let elapsed_secs = self.state.elapsed_secs();
        // Callers check for a session before getting here.
        let session_id = self.state.session_id.unwrap_or_default();
        let decision = SessionPolicy::new(&self.settings).next(
            completed,
            self.state.current_session_count,
            self.state.task_id.is_some(),
        );
        self.state.current_session_count = decision.session_count;

        let next_session_id = match decision.phase {
            Phase::Idle => {
                self.go_idle();
                None
            }
            next => Some(self.begin(next, decision.duration_secs)),
        };
        info!(
            %session_id,
            completed = completed.as_str(),
            next = decision.phase.as_str(),
            skipped,
            session_count = decision.session_count,
            "phase finished"
        );

        Event::PhaseCompleted {
            session_id,
            completed,
            task_id: self.state.task_id.clone(),
            elapsed_secs,
            skipped,
            next: decision.phase,
            next_session_id,
            next_duration_secs: decision.duration_secs,
            session_count: decision.session_count,
            at: Utc::now(),
        }
    }
}
