mod driver;
mod engine;
mod policy;
mod settings;
mod state;

pub use driver::{TimerDriver, TimerHandle, TICK_PERIOD};
pub use engine::TimerEngine;
pub use policy::{BreakKind, Decision, Phase, SessionPolicy};
pub use settings::{PomodoroSettings, MAX_DURATION_MIN};
pub use state::{format_clock, PomodoroState, SessionId, Snapshot};
