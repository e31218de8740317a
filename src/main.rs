//! Work Timer CLI - track work time against projects
//!
//! Every invocation is one view instance over the shared state file:
//! - `worktimer add "Website" --id 42` adds a project
//! - `worktimer start 42` / `worktimer stop` run the timer
//! - `worktimer watch` keeps a live panel open that follows other terminals

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use worktimer::cli::prompt::confirm_on_terminal;
use worktimer::cli::{run_watch, Cli, Commands, Display};
use worktimer::{AppConfig, Clock, Project, ProjectId, TimerEngine, TimerStateStore, ViewInstance};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so the panel on stdout stays clean.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
            return Ok(());
        }
        Some(command) => command,
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let state_file = config.resolve_state_file(cli.state_file)?;
    let store = TimerStateStore::new(state_file);
    tracing::debug!(store = ?store, "Opened state store");

    let engine = TimerEngine::system();

    if let Commands::Watch = command {
        return run_watch(&store, engine, &config).await;
    }

    let mut view = ViewInstance::open(&store, engine);
    run_action(command, &mut view, &config)
}

/// Runs a one-shot command against the view instance.
fn run_action<C: Clock>(
    command: Commands,
    view: &mut ViewInstance<'_, C>,
    config: &AppConfig,
) -> Result<()> {
    match command {
        Commands::Add(args) => {
            let id = args
                .project_id()
                .context("a project id or project URL is required")?;
            let already_tracked = view.state().contains(id);
            view.add_project(id, args.title.clone())?;
            Display::show_added(&Project::new(id, args.title), already_tracked);
        }
        Commands::Remove(args) => {
            let project = tracked(view, args.id)?;
            let question = format!("Really remove project #{} {}?", project.id, project.title);
            if confirm_on_terminal(&question, args.confirm.yes)? {
                view.remove_project(project.id)?;
                Display::show_removed(project.id);
            } else {
                Display::show_cancelled();
            }
        }
        Commands::Start(args) => {
            let project = tracked(view, args.id)?;
            if view.state().is_active(project.id) {
                Display::show_already_running(&project);
            } else {
                view.activate(Some(project.id))?;
                Display::show_started(&project, view.elapsed(project.id));
            }
        }
        Commands::Stop => {
            let running = view
                .state()
                .active_project()
                .and_then(|id| view.state().project(id).cloned());
            match running {
                Some(project) => {
                    view.stop()?;
                    Display::show_stopped(Some(&project), view.state().seconds_for(project.id));
                }
                None => Display::show_stopped(None, 0),
            }
        }
        Commands::Toggle(args) => {
            let project = tracked(view, args.id)?;
            let state = view.toggle(project.id)?;
            if state.is_active(project.id) {
                Display::show_started(&project, view.elapsed(project.id));
            } else {
                Display::show_stopped(Some(&project), state.seconds_for(project.id));
            }
        }
        Commands::Reset(args) => {
            let project = tracked(view, args.id)?;
            let state = view.reset_project_seconds(project.id)?;
            Display::show_reset(&project, state.is_active(project.id));
        }
        Commands::ResetAll(args) => {
            if confirm_on_terminal("Really reset everything?", args.yes)? {
                view.reset_all()?;
                Display::show_reset_all();
            } else {
                Display::show_cancelled();
            }
        }
        Commands::Log(args) => {
            let project = tracked(view, args.id)?;
            let handoff = view.log_hours(project.id)?;
            Display::show_handoff(&handoff, &config.base_url);
        }
        Commands::Status => {
            Display::show_panel(view.state(), view.engine().now());
        }
        // Handled in `execute` before a view instance is opened.
        Commands::Watch | Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Looks up a tracked project or fails with a readable message.
fn tracked<C: Clock>(view: &ViewInstance<'_, C>, id: ProjectId) -> Result<Project> {
    view.state()
        .project(id)
        .cloned()
        .with_context(|| format!("project #{} is not tracked", id))
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
