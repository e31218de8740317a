//! Work Timer Library
//!
//! This library provides the core functionality for the work timer CLI.
//! It includes:
//! - Timer engine: pure state transitions over the shared timer state
//! - State store: one JSON slot shared by every view instance, with
//!   change notification for writes made by other instances
//! - View instance: the per-process mirror that serializes user actions
//! - CLI command parsing, display utilities and the live watch view
//! - Configuration loading

pub mod cli;
pub mod config;
pub mod engine;
pub mod instance;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{HoursHandoff, Project, ProjectId, TimerState};

pub use engine::{
    current_elapsed_seconds, pretty_duration, suggested_hours, total_elapsed_seconds, Clock,
    MockClock, SystemClock, TimerEngine,
};

pub use store::{SlotWatcher, StoreError, SubscriptionId, TimerStateStore};

pub use instance::ViewInstance;

pub use config::{AppConfig, ConfigError};
