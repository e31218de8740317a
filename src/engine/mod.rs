//! Timer engine for the work timer.
//!
//! This module provides the timer state machine:
//! - Pure transitions that map a [`TimerState`] to its replacement
//! - The derived "current elapsed seconds" query for live display
//! - Duration formatting and hours rounding for the log-hours hand-off
//!
//! No function in this module performs I/O. Time is read through a [`Clock`].

pub mod clock;
pub mod format;

pub use clock::{Clock, MockClock, SystemClock};
pub use format::{pretty_duration, suggested_hours};

use crate::types::{HoursHandoff, Project, ProjectId, TimerState};

// ============================================================================
// Elapsed-time queries
// ============================================================================

/// Seconds between a run start and `now`, clamped at zero.
fn run_length(last_start: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(last_start)).unwrap_or(0)
}

/// Returns the seconds to display for a project at `now`.
///
/// This is the folded total plus, only for the active project, the length of
/// the in-progress run.
pub fn current_elapsed_seconds(state: &TimerState, project_id: ProjectId, now: i64) -> u64 {
    let folded = state.seconds_for(project_id);
    match state.last_start {
        Some(last_start) if state.is_active(project_id) => {
            folded.saturating_add(run_length(last_start, now))
        }
        _ => folded,
    }
}

/// Returns the sum of [`current_elapsed_seconds`] over all tracked projects.
pub fn total_elapsed_seconds(state: &TimerState, now: i64) -> u64 {
    state
        .projects
        .iter()
        .map(|p| current_elapsed_seconds(state, p.id, now))
        .fold(0, u64::saturating_add)
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Computes state transitions for user actions.
///
/// Every transition takes the current state by reference and returns a new
/// one; the input is never modified.
#[derive(Debug, Clone, Default)]
pub struct TimerEngine<C: Clock = SystemClock> {
    clock: C,
}

impl TimerEngine<SystemClock> {
    /// Creates an engine reading the system clock.
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> TimerEngine<C> {
    /// Creates an engine with the given clock.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Returns the engine's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the current timestamp according to the engine's clock.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Makes `project_id` the active project, or stops the timer for `None`.
    ///
    /// The running project's elapsed run is folded into its seconds first.
    /// A new run starts one second in the past so the live display advances
    /// on its first refresh. Activating an untracked id is a no-op.
    pub fn activate(&self, state: &TimerState, project_id: Option<ProjectId>) -> TimerState {
        if let Some(id) = project_id {
            if !state.contains(id) {
                tracing::debug!(project_id = id, "Ignoring activation of untracked project");
                return state.clone();
            }
        }

        let now = self.clock.now();
        let mut next = state.clone();

        if let (Some(active), Some(last_start)) = (state.active_project, state.last_start) {
            let folded = next.seconds.entry(active).or_insert(0);
            *folded = folded.saturating_add(run_length(last_start, now));
        }

        next.active_project = project_id;
        next.last_start = project_id.map(|_| now.saturating_sub(1));
        next
    }

    /// Stops the active project, folding its run.
    pub fn deactivate(&self, state: &TimerState) -> TimerState {
        self.activate(state, None)
    }

    /// Stops `project_id` if it is running, otherwise starts it.
    pub fn toggle(&self, state: &TimerState, project_id: ProjectId) -> TimerState {
        if state.is_active(project_id) {
            self.activate(state, None)
        } else {
            self.activate(state, Some(project_id))
        }
    }

    /// Adds a project with zero seconds. A known id is left untouched.
    pub fn add_project(
        &self,
        state: &TimerState,
        project_id: ProjectId,
        title: impl Into<String>,
    ) -> TimerState {
        if state.contains(project_id) {
            return state.clone();
        }

        let mut next = state.clone();
        next.projects.push(Project::new(project_id, title));
        next.projects.sort_by(|a, b| b.id.cmp(&a.id));
        next.seconds.insert(project_id, 0);
        next
    }

    /// Removes a project and its seconds.
    ///
    /// If it was running, the in-progress run is discarded, not folded.
    pub fn remove_project(&self, state: &TimerState, project_id: ProjectId) -> TimerState {
        if !state.contains(project_id) {
            return state.clone();
        }

        let mut next = state.clone();
        next.projects.retain(|p| p.id != project_id);
        next.seconds.remove(&project_id);
        if next.is_active(project_id) {
            next.active_project = None;
            next.last_start = None;
        }
        next
    }

    /// Zeroes a project's seconds.
    ///
    /// A running project keeps running with its run clock restarted at now.
    pub fn reset_project_seconds(&self, state: &TimerState, project_id: ProjectId) -> TimerState {
        if !state.contains(project_id) {
            return state.clone();
        }

        let mut next = state.clone();
        next.seconds.insert(project_id, 0);
        if next.is_active(project_id) {
            next.last_start = Some(self.clock.now());
        }
        next
    }

    /// Returns the empty default state.
    pub fn reset_all(&self) -> TimerState {
        TimerState::default()
    }

    /// Stops the timer and computes the hours to suggest for `project_id`.
    ///
    /// Whatever project is running is stopped, as logging hours ends the
    /// current run.
    pub fn log_hours(&self, state: &TimerState, project_id: ProjectId) -> (TimerState, HoursHandoff) {
        let next = self.activate(state, None);
        let hours = suggested_hours(next.seconds_for(project_id));
        (next, HoursHandoff { project_id, hours })
    }

    /// Returns the live seconds for a project.
    pub fn elapsed(&self, state: &TimerState, project_id: ProjectId) -> u64 {
        current_elapsed_seconds(state, project_id, self.clock.now())
    }

    /// Returns the live total over all projects.
    pub fn total_elapsed(&self, state: &TimerState) -> u64 {
        total_elapsed_seconds(state, self.clock.now())
    }
}

// ============================================================================
// Tests
// ============================================================================
