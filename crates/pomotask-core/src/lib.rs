//! # pomotask Core Library
//!
//! This library provides the focus-timer core of pomotask. All behavior is
//! available through the `pomotask` CLI, which is a thin host over this
//! crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine over work, short-break
//!   and long-break phases
//! - **Session Policy**: decides break kind and auto-advance when a phase ends
//! - **Tick Scheduler**: one tokio task per engine that owns the single
//!   one-second interval and serializes host commands
//! - **Storage**: SQLite task/session history and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`] / [`TimerHandle`]: Scheduler and its command surface
//! - [`Database`]: Task list, session and interruption persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod feedback;
pub mod recorder;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, TimerError, ValidationError};
pub use events::{CompletedSession, Event, Interruption};
pub use feedback::{pattern_for, Feedback, HapticPattern, NoFeedback};
pub use recorder::{MemoryRecorder, NullRecorder, SessionRecorder};
pub use storage::{Config, Database, Stats};
pub use task::{NoTasks, Task, TaskSource};
pub use timer::{
    BreakKind, Phase, PomodoroSettings, PomodoroState, SessionId, Snapshot, TimerDriver,
    TimerEngine, TimerHandle,
};
