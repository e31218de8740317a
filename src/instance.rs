//! One view instance's in-memory mirror of the shared timer state.
//!
//! Every action runs to completion before the next one is accepted:
//! compute the replacement state, persist it, then swap the mirror. If the
//! write fails the mirror keeps its previous value.

use tracing::info;

use crate::engine::{Clock, SystemClock, TimerEngine};
use crate::store::{StoreError, TimerStateStore};
use crate::types::{HoursHandoff, ProjectId, TimerState};

/// A view instance bound to a store.
#[derive(Debug)]
pub struct ViewInstance<'a, C: Clock = SystemClock> {
    store: &'a TimerStateStore,
    engine: TimerEngine<C>,
    state: TimerState,
}

impl<'a, C: Clock> ViewInstance<'a, C> {
    /// Opens a view instance, rehydrating the state from the store.
    pub fn open(store: &'a TimerStateStore, engine: TimerEngine<C>) -> Self {
        let state = store.load();
        Self {
            store,
            engine,
            state,
        }
    }

    /// Returns the current state snapshot.
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Returns the engine driving this instance.
    pub fn engine(&self) -> &TimerEngine<C> {
        &self.engine
    }

    /// Returns the live seconds for a project.
    pub fn elapsed(&self, project_id: ProjectId) -> u64 {
        self.engine.elapsed(&self.state, project_id)
    }

    /// Returns the live total over all projects.
    pub fn total_elapsed(&self) -> u64 {
        self.engine.total_elapsed(&self.state)
    }

    /// Replaces the mirror with a state written by another instance.
    ///
    /// Deliveries are queued, so a state may already be superseded by a
    /// later save of this instance or a later external write. Such a state
    /// is dropped and false is returned.
    pub fn apply_external(&mut self, state: TimerState) -> bool {
        if !self.store.is_latest(&state) {
            tracing::debug!(
                active_project = ?state.active_project(),
                "Dropping superseded external state"
            );
            return false;
        }
        tracing::debug!(
            active_project = ?state.active_project(),
            projects = state.projects().len(),
            "Applying external state"
        );
        self.state = state;
        true
    }

    /// Starts a project, or stops the timer for `None`.
    pub fn activate(&mut self, project_id: Option<ProjectId>) -> Result<&TimerState, StoreError> {
        let next = self.engine.activate(&self.state, project_id);
        self.commit(next, "activate", project_id)
    }

    /// Stops the running project.
    pub fn stop(&mut self) -> Result<&TimerState, StoreError> {
        self.activate(None)
    }

    /// Starts or stops a project.
    pub fn toggle(&mut self, project_id: ProjectId) -> Result<&TimerState, StoreError> {
        let next = self.engine.toggle(&self.state, project_id);
        self.commit(next, "toggle", Some(project_id))
    }

    /// Adds a project. A known id is left untouched.
    pub fn add_project(
        &mut self,
        project_id: ProjectId,
        title: impl Into<String>,
    ) -> Result<&TimerState, StoreError> {
        let next = self.engine.add_project(&self.state, project_id, title);
        self.commit(next, "add_project", Some(project_id))
    }

    /// Removes a project. The caller must have confirmed this.
    pub fn remove_project(&mut self, project_id: ProjectId) -> Result<&TimerState, StoreError> {
        let next = self.engine.remove_project(&self.state, project_id);
        self.commit(next, "remove_project", Some(project_id))
    }

    /// Zeroes a project's seconds.
    pub fn reset_project_seconds(
        &mut self,
        project_id: ProjectId,
    ) -> Result<&TimerState, StoreError> {
        let next = self.engine.reset_project_seconds(&self.state, project_id);
        self.commit(next, "reset_project_seconds", Some(project_id))
    }

    /// Resets everything. The caller must have confirmed this.
    pub fn reset_all(&mut self) -> Result<&TimerState, StoreError> {
        let next = self.engine.reset_all();
        self.commit(next, "reset_all", None)
    }

    /// Stops the timer and returns the hand-off for the create-hours form.
    pub fn log_hours(&mut self, project_id: ProjectId) -> Result<HoursHandoff, StoreError> {
        let (next, handoff) = self.engine.log_hours(&self.state, project_id);
        self.commit(next, "log_hours", Some(project_id))?;
        Ok(handoff)
    }

    fn commit(
        &mut self,
        next: TimerState,
        action: &'static str,
        project_id: Option<ProjectId>,
    ) -> Result<&TimerState, StoreError> {
        self.store.save(&next)?;
        self.state = next;
        info!(
            action,
            project_id = ?project_id,
            active_project = ?self.state.active_project(),
            "Timer state updated"
        );
        Ok(&self.state)
    }
}

// ============================================================================
// Tests
// ============================================================================
