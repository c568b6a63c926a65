//! Tick scheduler for a [`TimerEngine`].
//!
//! The scheduler runs as one tokio task that owns the engine. Hosts talk to
//! it through a cloneable [`TimerHandle`]; observers subscribe to the event
//! stream. The task holds at most one [`Interval`]: every command is
//! followed by a reconcile step that drops the interval when the countdown
//! is not active and creates one when it is, and `start` always cancels the
//! old interval before scheduling a new one.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::engine::TimerEngine;
use super::settings::PomodoroSettings;
use super::state::Snapshot;
use crate::error::TimerError;
use crate::events::Event;
use crate::feedback::Feedback;
use crate::recorder::SessionRecorder;
use crate::task::TaskSource;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

#[derive(Debug)]
enum Command {
    Start(Option<String>),
    Pause,
    Resume,
    Stop {
        record_interruption: bool,
        note: Option<String>,
    },
    Skip,
    Reset,
    UpdateSettings(PomodoroSettings),
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown,
}

#[derive(Debug)]
struct Request {
    command: Command,
    done: oneshot::Sender<()>,
}

/// Cloneable command surface of a running scheduler.
///
/// Each command resolves once the scheduler has applied it. Commands the
/// timer declines (for example `resume` with nothing to resume) still
/// resolve `Ok`; only a stopped scheduler yields an error.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Request>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    pub async fn start(&self, task_id: Option<String>) -> Result<(), TimerError> {
        self.request(Command::Start(task_id)).await
    }

    pub async fn pause(&self) -> Result<(), TimerError> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), TimerError> {
        self.request(Command::Resume).await
    }

    pub async fn stop(
        &self,
        record_interruption: bool,
        note: Option<String>,
    ) -> Result<(), TimerError> {
        self.request(Command::Stop {
            record_interruption,
            note,
        })
        .await
    }

    pub async fn skip(&self) -> Result<(), TimerError> {
        self.request(Command::Skip).await
    }

    pub async fn reset(&self) -> Result<(), TimerError> {
        self.request(Command::Reset).await
    }

    pub async fn update_settings(&self, settings: PomodoroSettings) -> Result<(), TimerError> {
        self.request(Command::UpdateSettings(settings)).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, TimerError> {
        let (tx, rx) = oneshot::channel();
        self.request(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| TimerError::SchedulerClosed)
    }

    /// Stop silently and end the scheduler task.
    pub async fn shutdown(&self) -> Result<(), TimerError> {
        self.request(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    async fn request(&self, command: Command) -> Result<(), TimerError> {
        let (done, rx) = oneshot::channel();
        self.commands
            .send(Request { command, done })
            .await
            .map_err(|_| TimerError::SchedulerClosed)?;
        rx.await.map_err(|_| TimerError::SchedulerClosed)
    }
}

/// Owns an engine and its collaborators until spawned.
pub struct TimerDriver<T, R, F> {
    engine: TimerEngine,
    tasks: T,
    recorder: R,
    feedback: F,
    period: Duration,
    ticker: Option<Interval>,
    events: broadcast::Sender<Event>,
}

enum Step {
    Tick,
    Request(Option<Request>),
}

impl<T, R, F> TimerDriver<T, R, F>
where
    T: TaskSource + Send + 'static,
    R: SessionRecorder + Send + 'static,
    F: Feedback + Send + 'static,
{
    pub fn new(engine: TimerEngine, tasks: T, recorder: R, feedback: F) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            engine,
            tasks,
            recorder,
            feedback,
            period: TICK_PERIOD,
            ticker: None,
            events,
        }
    }

    /// Change the tick cadence (one second by default).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Spawn onto the current tokio runtime.
    ///
    /// The join handle yields the engine after shutdown.
    pub fn spawn(self) -> (TimerHandle, JoinHandle<TimerEngine>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = TimerHandle {
            commands,
            events: self.events.clone(),
        };
        let join = tokio::spawn(self.run(rx));
        (handle, join)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) -> TimerEngine {
        let shutdown_ack = loop {
            let step = tokio::select! {
                biased;
                _ = next_tick(&mut self.ticker) => Step::Tick,
                request = rx.recv() => Step::Request(request),
            };
            match step {
                Step::Tick => self.on_tick(),
                Step::Request(None) => break None,
                Step::Request(Some(Request {
                    command: Command::Shutdown,
                    done,
                })) => break Some(done),
                Step::Request(Some(Request { command, done })) => {
                    self.handle(command);
                    let _ = done.send(());
                }
            }
        };

        // Host is gone: end any session without recording an interruption.
        if self.engine.session_id().is_some() {
            let event = self.engine.stop(false, None);
            self.dispatch(event);
        }
        self.ticker = None;
        debug!("timer scheduler stopped");
        if let Some(done) = shutdown_ack {
            let _ = done.send(());
        }
        self.engine
    }

    fn handle(&mut self, command: Command) {
        let result = match command {
            Command::Start(task_id) => {
                let result = self.engine.start(task_id, &self.tasks);
                if result.is_ok() {
                    self.ticker = None;
                }
                result
            }
            Command::Pause => self.engine.pause(),
            Command::Resume => self.engine.resume(),
            Command::Stop {
                record_interruption,
                note,
            } => Ok(self.engine.stop(record_interruption, note)),
            Command::Skip => {
                let result = self.engine.skip();
                if result.is_ok() {
                    self.ticker = None;
                }
                result
            }
            Command::Reset => Ok(self.engine.reset()),
            Command::UpdateSettings(settings) => {
                self.engine.set_settings(settings);
                return;
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
                return;
            }
            Command::Shutdown => return,
        };

        match result {
            Ok(event) => self.dispatch(event),
            Err(err) => debug!(error = %err, "timer command ignored"),
        }
        self.reconcile_ticker();
    }

    fn on_tick(&mut self) {
        match self.engine.tick() {
            Some(event) => {
                self.dispatch(event);
                self.reconcile_ticker();
            }
            None => {
                let state = self.engine.state();
                if let (true, Some(session_id)) = (state.active, state.session_id) {
                    self.publish(Event::Tick {
                        session_id,
                        phase: state.phase,
                        remaining_secs: state.time_remaining,
                    });
                }
            }
        }
    }

    fn reconcile_ticker(&mut self) {
        match (self.engine.is_active(), self.ticker.is_some()) {
            (true, false) => self.ticker = Some(new_interval(self.period)),
            (false, true) => self.ticker = None,
            _ => {}
        }
    }

    fn dispatch(&mut self, event: Event) {
        if let Some(interruption) = event.interruption() {
            if let Err(err) = self.recorder.record_interruption(interruption) {
                warn!(error = %err, "failed to record interruption");
            }
        }
        if let Some(session) = event.completed_session() {
            if let Err(err) = self.recorder.record_completion(&session) {
                warn!(error = %err, "failed to record completed session");
            }
        }
        self.feedback.on_event(&event);
        self.publish(event);
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    // Missed ticks are replayed so the countdown keeps pace with wall time.
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::NoFeedback;
    use crate::recorder::{MemoryRecorder, NullRecorder};
    use crate::task::NoTasks;
    use crate::timer::Phase;

    fn spawn_default() -> (TimerHandle, JoinHandle<TimerEngine>) {
        TimerDriver::new(TimerEngine::default(), NoTasks, NullRecorder, NoFeedback).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_period() {
        let (handle, _join) = spawn_default();
        handle.start(Some("t".into())).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 1500);

        time::advance(Duration::from_millis(3_500)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 1497);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_previous_ticker() {
        let (handle, _join) = spawn_default();
        handle.start(Some("t".into())).await.unwrap();
        time::advance(Duration::from_millis(2_500)).await;
        handle.start(Some("t".into())).await.unwrap();

        time::advance(Duration::from_millis(600)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 1500);
        time::advance(Duration::from_millis(500)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 1499);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticking() {
        let (handle, _join) = spawn_default();
        handle.start(Some("t".into())).await.unwrap();
        time::advance(Duration::from_secs(2)).await;
        handle.pause().await.unwrap();
        time::advance(Duration::from_secs(30)).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.active);
        assert_eq!(snap.time_remaining, 1498);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_commands_resolve_ok() {
        let (handle, _join) = spawn_default();
        handle.resume().await.unwrap();
        handle.start(None).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_silently() {
        let recorder = MemoryRecorder::new();
        let (handle, join) =
            TimerDriver::new(TimerEngine::default(), NoTasks, recorder.clone(), NoFeedback)
                .spawn();
        handle.start(Some("t".into())).await.unwrap();
        handle.shutdown().await.unwrap();
        let engine = join.await.unwrap();
        assert!(engine.session_id().is_none());
        assert!(recorder.interruptions().is_empty());
        assert_eq!(handle.pause().await, Err(TimerError::SchedulerClosed));
    }
}
