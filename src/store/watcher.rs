//! Filesystem watcher for the state slot.
//!
//! Watches the slot's parent directory (the slot is replaced by rename, so
//! watching the file itself would lose track of it) and forwards events for
//! the slot file name to [`Slot::refresh`].

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::error::StoreError;
use super::Slot;

/// Guard for a running slot watch. Dropping it stops the watch.
pub struct SlotWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl SlotWatcher {
    pub(crate) fn start(slot: Arc<Slot>) -> Result<Self, StoreError> {
        let path = slot.path().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| StoreError::InvalidPath(path.clone()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            path: dir.clone(),
            source,
        })?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_slot_event(&event, &file_name) {
                        slot.refresh();
                    }
                }
                Err(e) => warn!(error = %e, "State file watch error"),
            },
            Config::default(),
        )
        .map_err(|source| StoreError::Watch {
            path: dir.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| StoreError::Watch {
                path: dir.clone(),
                source,
            })?;

        debug!(dir = ?dir, "Watching state file for external changes");

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    /// Returns the watched state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_slot_event(event: &Event, file_name: &OsStr) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_)
    );
    relevant && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}
