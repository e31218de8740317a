//! Command definitions for the work timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::types::ProjectId;

// ============================================================================
// CLI Structure
// ============================================================================

/// Work timer CLI - track time against projects from any number of terminals
#[derive(Parser, Debug)]
#[command(
    name = "worktimer",
    version,
    about = "Track work time against projects",
    long_about = "Tracks elapsed work time against a set of projects, with at most one \
                  project running at a time.\n\
                  Every invocation shares one state file, and `worktimer watch` views \
                  update live when another terminal changes it.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Shared state file (overrides WORKTIMER_STATE_FILE and the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Config file to read instead of ~/.worktimer/config.json
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a project to the timer panel
    Add(AddArgs),

    /// Remove a project and discard its time
    Remove(ConfirmedProjectArgs),

    /// Start the timer for a project (stops any other)
    Start(ProjectArgs),

    /// Stop the running timer
    Stop,

    /// Start the project if stopped, stop it if running
    Toggle(ProjectArgs),

    /// Reset a project's time to zero
    Reset(ProjectArgs),

    /// Reset everything
    ResetAll(ConfirmArgs),

    /// Stop the timer and print the create-hours link for a project
    Log(ProjectArgs),

    /// Show the timer panel
    Status,

    /// Show the timer panel and keep it updated
    Watch,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the add command
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("project").required(true).args(["id", "url"])))]
pub struct AddArgs {
    /// Project title
    pub title: String,

    /// Project id
    #[arg(long)]
    pub id: Option<ProjectId>,

    /// Project page URL (the id is taken from `/projects/<id>/`)
    #[arg(long, value_parser = parse_project_url)]
    pub url: Option<ProjectId>,
}

impl AddArgs {
    /// Returns the project id from `--id` or `--url`.
    pub fn project_id(&self) -> Option<ProjectId> {
        self.id.or(self.url)
    }
}

/// A single project id
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project id
    pub id: ProjectId,
}

/// Confirmation for destructive commands
#[derive(Args, Debug, Clone, Default)]
pub struct ConfirmArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// A project id plus confirmation
#[derive(Args, Debug, Clone)]
pub struct ConfirmedProjectArgs {
    /// Project id
    pub id: ProjectId,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Extracts the project id from a project page URL.
///
/// Accepts any URL containing `/projects/<digits>/`.
pub fn parse_project_url(s: &str) -> Result<ProjectId, String> {
    let segments: Vec<&str> = s.split('/').collect();
    // A slash must precede `projects` (so never the first segment) and a
    // third segment must follow the id, i.e. the id ends with a slash.
    for window in segments.windows(3).skip(1) {
        let (prefix, id) = (window[0], window[1]);
        if prefix == "projects" && !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            return id
                .parse()
                .map_err(|_| format!("project id out of range in '{}'", s));
        }
    }
    Err(format!("no /projects/<id>/ segment in '{}'", s))
}

// ============================================================================
// Tests
// ============================================================================
