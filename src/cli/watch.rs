//! Live timer panel (`worktimer watch`).
//!
//! The watch view is one long-running view instance. Its event loop handles,
//! one at a time:
//! - a refresh tick, present only while a project is running
//! - states written by other instances, delivered by the store watcher
//! - commands typed on stdin
//! - Ctrl+C

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::cli::display::Display;
use crate::config::AppConfig;
use crate::engine::{Clock, TimerEngine};
use crate::instance::ViewInstance;
use crate::store::TimerStateStore;
use crate::types::{ProjectId, TimerState};

/// Clears the terminal and moves the cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const HELP: &str = "<id> start/stop  s stop  r <id> reset  l <id> log  q quit";

// ============================================================================
// LiveTicker
// ============================================================================

/// Repeating refresh timer that only exists while a project is running.
pub struct LiveTicker {
    period: Duration,
    interval: Option<Interval>,
}

impl LiveTicker {
    /// Creates a stopped ticker.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Starts the ticker when `running` becomes true, stops it when false.
    pub fn sync(&mut self, running: bool) {
        match (running, self.interval.is_some()) {
            (true, false) => {
                let mut interval = interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.interval = Some(interval);
                tracing::debug!(period = ?self.period, "Live refresh started");
            }
            (false, true) => {
                self.interval = None;
                tracing::debug!("Live refresh stopped");
            }
            _ => {}
        }
    }

    /// Returns true while the ticker is running.
    pub fn is_ticking(&self) -> bool {
        self.interval.is_some()
    }

    /// Waits for the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

// ============================================================================
// WatchCommand
// ============================================================================

/// A command typed into the watch view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Start or stop a project
    Toggle(ProjectId),
    /// Stop the running project
    Stop,
    /// Reset a project's time
    Reset(ProjectId),
    /// Log hours for a project
    Log(ProjectId),
    /// Redraw only
    Refresh,
    /// Show the key help
    Help,
    /// Leave the watch view
    Quit,
    /// Anything else
    Unknown(String),
}

/// Parses one input line.
pub fn parse_watch_command(line: &str) -> WatchCommand {
    let mut words = line.split_whitespace();
    let first = words.next();
    let arg = words.next().and_then(|w| w.parse::<ProjectId>().ok());

    match (first, arg) {
        (None, _) => WatchCommand::Refresh,
        (Some("q" | "quit" | "exit"), _) => WatchCommand::Quit,
        (Some("s" | "stop"), _) => WatchCommand::Stop,
        (Some("h" | "help" | "?"), _) => WatchCommand::Help,
        (Some("r" | "reset"), Some(id)) => WatchCommand::Reset(id),
        (Some("l" | "log"), Some(id)) => WatchCommand::Log(id),
        (Some(word), _) => match word.parse::<ProjectId>() {
            Ok(id) => WatchCommand::Toggle(id),
            Err(_) => WatchCommand::Unknown(line.trim().to_string()),
        },
    }
}

/// Runs a command against the view and returns the status line to show.
///
/// Store failures are reported in the status line; the view keeps running.
pub fn apply_command<C: Clock>(
    view: &mut ViewInstance<'_, C>,
    command: &WatchCommand,
    base_url: &str,
) -> String {
    let result = match command {
        WatchCommand::Toggle(id) => {
            if let Some(message) = unknown_project(view, *id) {
                return message;
            }
            view.toggle(*id).map(|state| {
                if state.is_active(*id) {
                    format!("Started #{}", id)
                } else {
                    format!("Stopped #{}", id)
                }
            })
        }
        WatchCommand::Stop => view.stop().map(|_| "Stopped".to_string()),
        WatchCommand::Reset(id) => {
            if let Some(message) = unknown_project(view, *id) {
                return message;
            }
            view.reset_project_seconds(*id)
                .map(|_| format!("Reset #{}", id))
        }
        WatchCommand::Log(id) => {
            if let Some(message) = unknown_project(view, *id) {
                return message;
            }
            view.log_hours(*id)
                .map(|handoff| format!("Log hours: {}", handoff.create_hours_url(base_url)))
        }
        WatchCommand::Refresh | WatchCommand::Quit => return String::new(),
        WatchCommand::Help => return HELP.to_string(),
        WatchCommand::Unknown(input) => return format!("Unknown command '{}' ({})", input, HELP),
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Watch view action failed");
        format!("error: {}", e)
    })
}

fn unknown_project<C: Clock>(view: &ViewInstance<'_, C>, id: ProjectId) -> Option<String> {
    if view.state().contains(id) {
        None
    } else {
        Some(format!("Unknown project #{}", id))
    }
}

// ============================================================================
// Event loop
// ============================================================================

fn redraw<C: Clock>(view: &ViewInstance<'_, C>, status: &str) {
    print!("{}", CLEAR_SCREEN);
    Display::show_panel(view.state(), view.engine().now());
    println!();
    if status.is_empty() {
        println!("{}", HELP);
    } else {
        println!("{}", status);
    }
}

/// Runs the watch view until `q`, end of input or Ctrl+C.
///
/// # Errors
///
/// Returns an error if the state file cannot be watched or stdin fails.
pub async fn run_watch<C: Clock>(
    store: &TimerStateStore,
    engine: TimerEngine<C>,
    config: &AppConfig,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<TimerState>();
    let subscription = store.subscribe(move |state| {
        let _ = tx.send(state.clone());
    });

    let result = event_loop(store, engine, config, rx).await;

    store.unsubscribe(subscription);
    result
}

async fn event_loop<C: Clock>(
    store: &TimerStateStore,
    engine: TimerEngine<C>,
    config: &AppConfig,
    mut external: mpsc::UnboundedReceiver<TimerState>,
) -> Result<()> {
    let _watcher = store.watch().context("failed to watch the state file")?;

    let mut view = ViewInstance::open(store, engine);
    let mut ticker = LiveTicker::new(Duration::from_secs(config.tick_seconds));
    ticker.sync(view.state().is_running());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut status = String::new();
    redraw(&view, &status);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(state) = external.recv() => {
                if view.apply_external(state) {
                    status = "Updated from another view".to_string();
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                let command = parse_watch_command(&line);
                if command == WatchCommand::Quit {
                    break;
                }
                status = apply_command(&mut view, &command, &config.base_url);
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        ticker.sync(view.state().is_running());
        redraw(&view, &status);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
