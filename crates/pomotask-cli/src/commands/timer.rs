//! Foreground timer session.
//!
//! The scheduler owns the countdown; this module only forwards stdin
//! commands to it and prints the events it publishes.

use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use pomotask_core::storage::FeedbackConfig;
use pomotask_core::timer::format_clock;
use pomotask_core::{
    pattern_for, Config, Database, Event, Feedback, Phase, Snapshot, TimerDriver, TimerEngine,
    TimerHandle,
};
use tokio::sync::{broadcast, mpsc};

const HELP: &str = "commands: pause, resume, skip, stop, interrupt [note], start [task], status, quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a session in the foreground, reading commands from stdin
    Run {
        /// Task ID (defaults to the oldest open task)
        #[arg(long)]
        task: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Tick period in milliseconds
        #[arg(long, default_value = "1000", hide = true)]
        tick_ms: u64,
    },
    /// Print the configured durations and cycle rules as JSON
    Settings,
}

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Start(Option<String>),
    Pause,
    Resume,
    Skip,
    Stop,
    Interrupt(Option<String>),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, Some(rest.trim().to_string()).filter(|r| !r.is_empty())),
        None => (line, None),
    };
    let input = match word {
        "start" => Input::Start(rest),
        "pause" | "p" => Input::Pause,
        "resume" | "r" => Input::Resume,
        "skip" | "k" => Input::Skip,
        "stop" | "s" => Input::Stop,
        "interrupt" | "i" => Input::Interrupt(rest),
        "status" | "" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// Rings the terminal bell once per pulse of the haptic pattern.
struct TerminalFeedback {
    enabled: bool,
}

impl TerminalFeedback {
    fn new(config: &FeedbackConfig) -> Self {
        Self {
            enabled: config.enabled && config.bell,
        }
    }
}

impl Feedback for TerminalFeedback {
    fn on_event(&mut self, event: &Event) {
        if !self.enabled {
            return;
        }
        if let Some(pattern) = pattern_for(event) {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all("\x07".repeat(pattern.pulses()).as_bytes());
            let _ = stderr.flush();
        }
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run {
            task,
            json,
            tick_ms,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result =
                runtime.block_on(run_session(task, json, Duration::from_millis(tick_ms.max(1))));
            runtime.shutdown_background();
            result
        }
        TimerAction::Settings => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config.timer)?);
            Ok(())
        }
    }
}

async fn run_session(
    task: Option<String>,
    json: bool,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let engine = TimerEngine::new(config.timer.clone());
    let driver = TimerDriver::new(
        engine,
        Database::open()?,
        Database::open()?,
        TerminalFeedback::new(&config.feedback),
    )
    .with_period(period);
    let (handle, join) = driver.spawn();
    tracing::debug!(?period, settings = ?config.timer, "timer session starting");
    let printer = tokio::spawn(print_events(handle.subscribe(), json));
    let mut input = spawn_input();
    // Let the Ctrl-C listener register before the session starts.
    tokio::task::yield_now().await;

    handle.start(task).await?;
    if handle.snapshot().await?.phase == Phase::Idle {
        eprintln!("no task selected: pass --task or add one with `pomotask task add`");
    } else if !json {
        eprintln!("{HELP}");
    }

    let result = read_commands(&handle, &config, json, &mut input).await;

    handle.shutdown().await?;
    drop(handle);
    join.await?;
    printer.await?;
    result
}

/// Input lines, with `None` for EOF or Ctrl-C.
///
/// Stdin is read on a detached thread; a pending read never holds up
/// runtime shutdown.
fn spawn_input() -> mpsc::UnboundedReceiver<Option<String>> {
    let (tx, rx) = mpsc::unbounded_channel();

    let lines = tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if lines.send(Some(line)).is_err() {
                return;
            }
        }
        let _ = lines.send(None);
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(None);
        }
    });

    rx
}

async fn read_commands(
    handle: &TimerHandle,
    config: &Config,
    json: bool,
    input: &mut mpsc::UnboundedReceiver<Option<String>>,
) -> Result<(), Box<dyn std::error::Error>> {
    while let Some(Some(line)) = input.recv().await {
        match parse_input(&line) {
            Some(Input::Start(task)) => handle.start(task).await?,
            Some(Input::Pause) => handle.pause().await?,
            Some(Input::Resume) => handle.resume().await?,
            Some(Input::Skip) => handle.skip().await?,
            Some(Input::Stop) if config.interruptions.prompt_on_stop => {
                eprint!("interruption note (blank for none): ");
                let note = input.recv().await.flatten();
                handle.stop(true, note).await?;
            }
            Some(Input::Stop) => handle.stop(false, None).await?,
            Some(Input::Interrupt(note)) => handle.stop(true, note).await?,
            Some(Input::Status) => print_snapshot(&handle.snapshot().await?, json)?,
            Some(Input::Help) => eprintln!("{HELP}"),
            Some(Input::Quit) => return Ok(()),
            None => eprintln!("unknown command: {} ({HELP})", line.trim()),
        }
    }
    Ok(())
}

async fn print_events(mut rx: broadcast::Receiver<Event>, json: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if json {
                    if let Ok(line) = serde_json::to_string(&event) {
                        println!("{line}");
                    }
                } else {
                    render_event(&event);
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn render_event(event: &Event) {
    let mut stdout = std::io::stdout();
    let line = match event {
        Event::Tick {
            phase,
            remaining_secs,
            ..
        } => {
            let _ = write!(stdout, "\r{:<12} {}", phase.label(), format_clock(*remaining_secs));
            let _ = stdout.flush();
            return;
        }
        Event::SessionStarted {
            phase,
            task_id,
            duration_secs,
            ..
        } => format!(
            "{} started ({}) task {}",
            phase.label(),
            format_clock(*duration_secs),
            task_id.as_deref().unwrap_or("-")
        ),
        Event::Paused { remaining_secs, .. } => {
            format!("paused at {}", format_clock(*remaining_secs))
        }
        Event::Resumed { remaining_secs, .. } => {
            format!("resumed at {}", format_clock(*remaining_secs))
        }
        Event::PhaseCompleted {
            completed,
            skipped,
            next,
            next_duration_secs,
            session_count,
            ..
        } => {
            let verb = if *skipped { "skipped" } else { "finished" };
            match next {
                Phase::Idle => format!("{} {verb}; cycle idle", completed.label()),
                next => format!(
                    "{} {verb} -> {} ({}), {session_count} work session(s) this cycle",
                    completed.label(),
                    next.label(),
                    format_clock(*next_duration_secs)
                ),
            }
        }
        Event::Stopped { interruption, .. } => match interruption {
            Some(_) => "stopped (interruption recorded)".to_string(),
            None => "stopped".to_string(),
        },
        Event::Reset { .. } => "reset".to_string(),
    };
    let _ = writeln!(stdout, "\r{line}");
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        let state = if snapshot.active {
            "running"
        } else if snapshot.session_id.is_some() {
            "paused"
        } else {
            "idle"
        };
        println!(
            "\r{} {} [{state}] {}/{} work sessions",
            snapshot.phase.label(),
            snapshot.clock(),
            snapshot.current_session_count,
            snapshot.sessions_until_long_break
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(parse_input("pause"), Some(Input::Pause));
        assert_eq!(parse_input("  p "), Some(Input::Pause));
        assert_eq!(parse_input("k"), Some(Input::Skip));
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input(""), Some(Input::Status));
        assert_eq!(parse_input("dance"), None);
    }

    #[test]
    fn interrupt_keeps_note_text() {
        assert_eq!(
            parse_input("interrupt phone call from bank"),
            Some(Input::Interrupt(Some("phone call from bank".into())))
        );
        assert_eq!(parse_input("i"), Some(Input::Interrupt(None)));
        assert_eq!(parse_input("interrupt   "), Some(Input::Interrupt(None)));
    }

    #[test]
    fn start_takes_optional_task() {
        assert_eq!(parse_input("start abc"), Some(Input::Start(Some("abc".into()))));
        assert_eq!(parse_input("start"), Some(Input::Start(None)));
    }

    #[test]
    fn bell_respects_config() {
        let off = TerminalFeedback::new(&FeedbackConfig {
            enabled: true,
            bell: false,
        });
        assert!(!off.enabled);
        let on = TerminalFeedback::new(&FeedbackConfig::default());
        assert!(on.enabled);
    }
}
