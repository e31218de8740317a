//! Core data types for the work timer.
//!
//! This module defines the data structures used for:
//! - Tracked projects
//! - The persisted timer state shared by every view instance
//! - The hand-off value passed to the external "create hours" form

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Externally assigned project identifier.
pub type ProjectId = u64;

// ============================================================================
// Project
// ============================================================================

/// A project that time is tracked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project id (identity is id equality)
    pub id: ProjectId,
    /// Display title, taken as given
    pub title: String,
}

impl Project {
    /// Creates a new project.
    pub fn new(id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The single persisted aggregate shared by all view instances.
///
/// Fields are only mutated by [`crate::engine::TimerEngine`] transitions, each
/// of which returns a complete replacement value. The serialized key names
/// (`activeProject`, `lastStart`) are part of the persisted slot layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Tracked projects, descending by id
    #[serde(default)]
    pub(crate) projects: Vec<Project>,
    /// Seconds accumulated per project, excluding the in-progress run
    #[serde(default)]
    pub(crate) seconds: BTreeMap<ProjectId, u64>,
    /// The project currently accumulating time
    #[serde(rename = "activeProject", default)]
    pub(crate) active_project: Option<ProjectId>,
    /// Epoch seconds at which the current run began (backdated by one second)
    #[serde(rename = "lastStart", default)]
    pub(crate) last_start: Option<i64>,
}

impl TimerState {
    /// Returns the tracked projects, newest id first.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Returns the project with the given id, if tracked.
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Returns true if a project with the given id is tracked.
    pub fn contains(&self, id: ProjectId) -> bool {
        self.project(id).is_some()
    }

    /// Returns the folded seconds for a project (absent entries read as 0).
    pub fn seconds_for(&self, id: ProjectId) -> u64 {
        self.seconds.get(&id).copied().unwrap_or(0)
    }

    /// Returns the raw per-project seconds map.
    pub fn seconds(&self) -> &BTreeMap<ProjectId, u64> {
        &self.seconds
    }

    /// Returns the active project id.
    pub fn active_project(&self) -> Option<ProjectId> {
        self.active_project
    }

    /// Returns the start timestamp of the current run.
    pub fn last_start(&self) -> Option<i64> {
        self.last_start
    }

    /// Returns true if some project is accumulating time.
    pub fn is_running(&self) -> bool {
        self.active_project.is_some()
    }

    /// Returns true if the given project is the active one.
    pub fn is_active(&self, id: ProjectId) -> bool {
        self.active_project == Some(id)
    }

    /// Repairs a rehydrated state so the activation invariants hold.
    ///
    /// Projects are sorted descending by id and de-duplicated. A half-set or
    /// dangling activation is cleared without folding any time.
    pub(crate) fn normalized(mut self) -> Self {
        self.projects.sort_by(|a, b| b.id.cmp(&a.id));
        self.projects.dedup_by_key(|p| p.id);

        let activation_valid = match (self.active_project, self.last_start) {
            (Some(id), Some(_)) => self.contains(id),
            (None, None) => true,
            _ => false,
        };
        if !activation_valid {
            tracing::warn!(
                active_project = ?self.active_project,
                last_start = ?self.last_start,
                "Discarding inconsistent activation from persisted state"
            );
            self.active_project = None;
            self.last_start = None;
        }

        self
    }
}

// ============================================================================
// HoursHandoff
// ============================================================================

/// What the core hands to the external "create hours" form.
#[derive(Debug, Clone, PartialEq)]
pub struct HoursHandoff {
    /// Project the hours are logged against
    pub project_id: ProjectId,
    /// Suggested hours, rounded up to the next tenth; absent when nothing was tracked
    pub hours: Option<f64>,
}

impl HoursHandoff {
    /// Builds the create-hours URL for this hand-off.
    pub fn create_hours_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let mut url = format!("{}/projects/{}/createhours/", base, self.project_id);
        if let Some(hours) = self.hours {
            url.push_str(&format!("?hours={}", hours));
        }
        url
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // TimerState Tests
    // ------------------------------------------------------------------------

    mod timer_state_tests {
        use super::*;

        fn two_projects() -> TimerState {
            TimerState {
                projects: vec![Project::new(2, "Beta"), Project::new(1, "Alpha")],
                seconds: BTreeMap::from([(1, 30), (2, 0)]),
                active_project: None,
                last_start: None,
            }
        }

        #[test]
        fn test_default_is_empty() {
            let state = TimerState::default();
            assert!(state.projects().is_empty());
            assert!(state.seconds().is_empty());
            assert_eq!(state.active_project(), None);
            assert_eq!(state.last_start(), None);
            assert!(!state.is_running());
        }

        #[test]
        fn test_seconds_for_absent_entry_is_zero() {
            let state = two_projects();
            assert_eq!(state.seconds_for(1), 30);
            assert_eq!(state.seconds_for(99), 0);
        }

        #[test]
        fn test_project_lookup() {
            let state = two_projects();
            assert_eq!(state.project(2).map(|p| p.title.as_str()), Some("Beta"));
            assert!(state.contains(1));
            assert!(!state.contains(3));
        }

        #[test]
        fn test_deserialize_persisted_layout() {
            let json = r#"{
                "projects": [{"id": 7, "title": "Website"}],
                "seconds": {"7": 125},
                "activeProject": 7,
                "lastStart": 1700000000
            }"#;
            let state: TimerState = serde_json::from_str(json).unwrap();

            assert_eq!(state.projects(), &[Project::new(7, "Website")]);
            assert_eq!(state.seconds_for(7), 125);
            assert_eq!(state.active_project(), Some(7));
            assert_eq!(state.last_start(), Some(1_700_000_000));
        }

        #[test]
        fn test_serialize_uses_persisted_key_names() {
            let state = TimerState {
                active_project: Some(1),
                last_start: Some(99),
                ..two_projects()
            };
            let value = serde_json::to_value(&state).unwrap();

            assert_eq!(value["activeProject"], 1);
            assert_eq!(value["lastStart"], 99);
            assert_eq!(value["seconds"]["1"], 30);
        }

        #[test]
        fn test_deserialize_missing_fields_uses_defaults() {
            let state: TimerState = serde_json::from_str("{}").unwrap();
            assert_eq!(state, TimerState::default());
        }

        #[test]
        fn test_normalized_sorts_and_dedups_projects() {
            let state = TimerState {
                projects: vec![
                    Project::new(1, "Alpha"),
                    Project::new(3, "Gamma"),
                    Project::new(1, "Alpha again"),
                ],
                ..TimerState::default()
            }
            .normalized();

            let ids: Vec<_> = state.projects().iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![3, 1]);
            assert_eq!(state.project(1).unwrap().title, "Alpha");
        }

        #[test]
        fn test_normalized_clears_half_set_activation() {
            let state = TimerState {
                active_project: Some(1),
                last_start: None,
                ..two_projects()
            }
            .normalized();

            assert_eq!(state.active_project(), None);
            assert_eq!(state.last_start(), None);
            assert_eq!(state.seconds_for(1), 30);
        }

        #[test]
        fn test_normalized_clears_dangling_activation() {
            let state = TimerState {
                active_project: Some(42),
                last_start: Some(10),
                ..two_projects()
            }
            .normalized();

            assert!(!state.is_running());
            assert_eq!(state.last_start(), None);
        }

        #[test]
        fn test_normalized_keeps_valid_activation() {
            let state = TimerState {
                active_project: Some(2),
                last_start: Some(10),
                ..two_projects()
            };
            assert_eq!(state.clone().normalized(), state);
        }
    }

    // ------------------------------------------------------------------------
    // HoursHandoff Tests
    // ------------------------------------------------------------------------

    mod hours_handoff_tests {
        use super::*;

        #[test]
        fn test_url_with_hours() {
            let handoff = HoursHandoff {
                project_id: 42,
                hours: Some(0.1),
            };
            assert_eq!(
                handoff.create_hours_url("https://workbench.example.com"),
                "https://workbench.example.com/projects/42/createhours/?hours=0.1"
            );
        }

        #[test]
        fn test_url_whole_hours_has_no_fraction() {
            let handoff = HoursHandoff {
                project_id: 3,
                hours: Some(1.0),
            };
            assert_eq!(
                handoff.create_hours_url("http://localhost:8000/"),
                "http://localhost:8000/projects/3/createhours/?hours=1"
            );
        }

        #[test]
        fn test_url_without_hours() {
            let handoff = HoursHandoff {
                project_id: 3,
                hours: None,
            };
            assert_eq!(
                handoff.create_hours_url("http://localhost:8000"),
                "http://localhost:8000/projects/3/createhours/"
            );
        }
    }
}
