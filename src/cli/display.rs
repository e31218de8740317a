//! Display utilities for the work timer CLI.
//!
//! This module provides formatted output for:
//! - The timer panel (one row per project plus the running total)
//! - Action confirmations
//! - Error messages

use crate::engine::{current_elapsed_seconds, pretty_duration, total_elapsed_seconds};
use crate::types::{HoursHandoff, Project, ProjectId, TimerState};

/// Width of the title column in the panel.
const TITLE_WIDTH: usize = 32;

/// Horizontal rule under the panel header.
const RULE: &str = "────────────────────────────────────────────────────";

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Renders the timer panel at `now`.
    pub fn render_panel(state: &TimerState, now: i64) -> String {
        let mut out = format!(
            "Timer  {}\n{}\n",
            pretty_duration(total_elapsed_seconds(state, now)),
            RULE
        );

        if state.projects().is_empty() {
            out.push_str("No projects added yet.\n");
            return out;
        }

        for project in state.projects() {
            let marker = if state.is_active(project.id) { ">" } else { " " };
            out.push_str(&format!(
                "{} #{:<6} {:<width$} {:>10}\n",
                marker,
                project.id,
                Self::truncate(&project.title, TITLE_WIDTH),
                pretty_duration(current_elapsed_seconds(state, project.id, now)),
                width = TITLE_WIDTH,
            ));
        }
        out
    }

    /// Shows the timer panel.
    pub fn show_panel(state: &TimerState, now: i64) {
        print!("{}", Self::render_panel(state, now));
    }

    /// Shows the result of adding a project.
    pub fn show_added(project: &Project, already_tracked: bool) {
        if already_tracked {
            println!("= Project #{} is already tracked", project.id);
        } else {
            println!("+ Added project #{} {}", project.id, project.title);
        }
    }

    /// Shows the result of removing a project.
    pub fn show_removed(project_id: ProjectId) {
        println!("- Removed project #{}", project_id);
    }

    /// Shows that a project is now running.
    pub fn show_started(project: &Project, elapsed: u64) {
        println!("> Started #{} {}", project.id, project.title);
        println!("  Elapsed: {}", pretty_duration(elapsed));
    }

    /// Shows that a project was already running.
    pub fn show_already_running(project: &Project) {
        println!("> #{} {} is already running", project.id, project.title);
    }

    /// Shows that the timer stopped.
    pub fn show_stopped(project: Option<&Project>, elapsed: u64) {
        match project {
            Some(project) => {
                println!("[] Stopped #{} {}", project.id, project.title);
                println!("  Elapsed: {}", pretty_duration(elapsed));
            }
            None => println!("[] No timer is running"),
        }
    }

    /// Shows that a project's time was reset.
    pub fn show_reset(project: &Project, running: bool) {
        if running {
            println!("0 Reset #{} {} (still running)", project.id, project.title);
        } else {
            println!("0 Reset #{} {}", project.id, project.title);
        }
    }

    /// Shows that everything was reset.
    pub fn show_reset_all() {
        println!("0 Reset all projects");
    }

    /// Shows the log-hours hand-off.
    pub fn show_handoff(handoff: &HoursHandoff, base_url: &str) {
        match handoff.hours {
            Some(hours) => println!("Log {} h for project #{}", hours, handoff.project_id),
            None => println!("Log hours for project #{}", handoff.project_id),
        }
        println!("  {}", handoff.create_hours_url(base_url));
    }

    /// Shows that a destructive action was declined.
    pub fn show_cancelled() {
        println!("Cancelled");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("error: {}", message);
    }

    /// Shortens a title to `width` characters.
    fn truncate(title: &str, width: usize) -> String {
        if title.chars().count() <= width {
            return title.to_string();
        }
        let kept: String = title.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// ============================================================================
// Tests
// ============================================================================
