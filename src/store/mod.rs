//! Durable single-slot persistence for the timer state.
//!
//! This module provides the [`TimerStateStore`]:
//! - `load` rehydrates the state from one JSON file, falling back to default
//! - `save` writes the state atomically (write-to-temp + rename)
//! - `subscribe` delivers states written by *other* view instances
//! - `watch` starts the filesystem watcher that feeds subscribers
//!
//! There is no locking between instances; the last write wins. A store
//! remembers the last payload it wrote or read, so its own writes never come
//! back through its subscribers. Within one store, slot reads and the rename
//! of a save are serialized, so every read is ordered against own writes.

pub mod error;
pub mod watcher;

pub use error::StoreError;
pub use watcher::SlotWatcher;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::types::TimerState;

/// Name of the shared slot; the default state file is `<SLOT_KEY>.json`.
pub const SLOT_KEY: &str = "workbench-timer";

/// Handle returned by [`TimerStateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&TimerState) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parse_state(payload: &str) -> Result<TimerState, serde_json::Error> {
    serde_json::from_str::<TimerState>(payload).map(TimerState::normalized)
}

// ============================================================================
// Slot
// ============================================================================

/// The slot content this store last wrote or read.
#[derive(Debug, Default)]
struct SlotTracking {
    payload: Option<String>,
    state: Option<TimerState>,
}

impl SlotTracking {
    fn record(&mut self, payload: String, state: TimerState) {
        self.payload = Some(payload);
        self.state = Some(state);
    }
}

/// State shared between the store and its watcher thread.
pub(crate) struct Slot {
    path: PathBuf,
    instance_id: Uuid,
    tracking: Mutex<SlotTracking>,
    subscribers: Mutex<Vec<(SubscriptionId, Handler)>>,
    next_subscription: AtomicU64,
}

impl Slot {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| SLOT_KEY.to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, self.instance_id.simple()))
    }

    /// Re-reads the slot and notifies subscribers if it holds a new state.
    pub(crate) fn refresh(&self) -> Option<TimerState> {
        let state = {
            // Held across the read so it cannot interleave with our own rename.
            let mut tracking = lock(&self.tracking);
            let payload = match fs::read_to_string(&self.path) {
                Ok(payload) => payload,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    trace!(path = ?self.path, "State file missing, ignoring change");
                    return None;
                }
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Failed to read changed state file");
                    return None;
                }
            };

            if tracking.payload.as_deref() == Some(payload.as_str()) {
                trace!(instance = %self.instance_id, "State file unchanged, skipping");
                return None;
            }
            let state = match parse_state(&payload) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Ignoring malformed state change");
                    return None;
                }
            };
            tracking.record(payload, state.clone());
            state
        };

        let handlers: Vec<Handler> = lock(&self.subscribers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        debug!(
            instance = %self.instance_id,
            subscribers = handlers.len(),
            active_project = ?state.active_project(),
            "Delivering external state change"
        );
        for handler in handlers {
            handler(&state);
        }

        Some(state)
    }
}

// ============================================================================
// TimerStateStore
// ============================================================================

/// Persists the [`TimerState`] in one shared file.
///
/// Construct one store per process and pass it by reference.
pub struct TimerStateStore {
    slot: Arc<Slot>,
}

impl TimerStateStore {
    /// Creates a store for the given state file. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            slot: Arc::new(Slot {
                path: path.into(),
                instance_id: Uuid::new_v4(),
                tracking: Mutex::new(SlotTracking::default()),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        self.slot.path()
    }

    /// Returns the id identifying this store in logs.
    pub fn instance_id(&self) -> Uuid {
        self.slot.instance_id
    }

    /// Loads the persisted state.
    ///
    /// A missing, unreadable or malformed file yields the default state.
    pub fn load(&self) -> TimerState {
        let path = self.path();
        let mut tracking = lock(&self.slot.tracking);
        match fs::read_to_string(path) {
            Ok(payload) => match parse_state(&payload) {
                Ok(state) => {
                    debug!(
                        path = ?path,
                        projects = state.projects().len(),
                        active_project = ?state.active_project(),
                        "Loaded timer state"
                    );
                    tracking.record(payload, state.clone());
                    state
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "Persisted timer state is malformed, using default");
                    TimerState::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "No persisted timer state, using default");
                TimerState::default()
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read timer state, using default");
                TimerState::default()
            }
        }
    }

    /// Writes the state to the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or written.
    pub fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        let payload = serde_json::to_string(state)?;
        let path = self.path();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.slot.temp_path();
        fs::write(&tmp_path, &payload).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;

        {
            // A change event read cannot land between the rename and the record.
            let mut tracking = lock(&self.slot.tracking);
            if let Err(source) = fs::rename(&tmp_path, path) {
                drop(tracking);
                let _ = fs::remove_file(&tmp_path);
                return Err(StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                });
            }
            tracking.record(payload, state.clone());
        }

        debug!(
            path = ?path,
            instance = %self.slot.instance_id,
            active_project = ?state.active_project(),
            "Saved timer state"
        );
        Ok(())
    }

    /// Registers a handler for states written by other view instances.
    ///
    /// Handlers run on the watcher thread; they should hand the state over
    /// to the view rather than do heavy work.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&TimerState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.slot.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.slot.subscribers).push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.slot.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Re-reads the slot and notifies subscribers if another instance changed it.
    ///
    /// The watcher calls this on every relevant filesystem event; it can also
    /// be called directly to poll.
    pub fn refresh(&self) -> Option<TimerState> {
        self.slot.refresh()
    }

    /// Returns true if `state` is the newest slot content this store has
    /// written or read.
    ///
    /// A delivered state that fails this check was superseded, by a later
    /// save of this store or a later external write, before it was applied.
    pub fn is_latest(&self, state: &TimerState) -> bool {
        lock(&self.slot.tracking).state.as_ref() == Some(state)
    }

    /// Starts watching the slot for external changes.
    ///
    /// Watching stops when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be started.
    pub fn watch(&self) -> Result<SlotWatcher, StoreError> {
        SlotWatcher::start(Arc::clone(&self.slot))
    }
}

impl fmt::Debug for TimerStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerStateStore")
            .field("path", &self.slot.path)
            .field("instance_id", &self.slot.instance_id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Project;

    fn temp_slot() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbench-timer.json");
        (dir, path)
    }

    fn sample_state() -> TimerState {
        TimerState {
            projects: vec![Project::new(2, "Beta"), Project::new(1, "Alpha")],
            seconds: [(1, 120), (2, 0)].into_iter().collect(),
            active_project: Some(2),
            last_start: Some(1_700_000_000),
        }
    }

    fn recording(store: &TimerStateStore) -> Arc<Mutex<Vec<TimerState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |state| sink.lock().unwrap().push(state.clone()));
        seen
    }

    // ------------------------------------------------------------------------
    // load / save Tests
    // ------------------------------------------------------------------------

    mod load_save_tests {
        use super::*;

        #[test]
        fn test_load_missing_file_is_default() {
            let (_dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);
            assert_eq!(store.load(), TimerState::default());
        }

        #[test]
        fn test_load_malformed_file_is_default() {
            let (_dir, path) = temp_slot();
            fs::write(&path, "{not json").unwrap();

            let store = TimerStateStore::new(&path);
            assert_eq!(store.load(), TimerState::default());
        }

        #[test]
        fn test_load_null_payload_is_default() {
            let (_dir, path) = temp_slot();
            fs::write(&path, "null").unwrap();

            let store = TimerStateStore::new(&path);
            assert_eq!(store.load(), TimerState::default());
        }

        #[test]
        fn test_load_negative_seconds_is_default() {
            let (_dir, path) = temp_slot();
            fs::write(&path, r#"{"projects":[],"seconds":{"1":-5}}"#).unwrap();

            let store = TimerStateStore::new(&path);
            assert_eq!(store.load(), TimerState::default());
        }

        #[test]
        fn test_save_then_load() {
            let (_dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);

            store.save(&sample_state()).unwrap();

            let other = TimerStateStore::new(&path);
            assert_eq!(other.load(), sample_state());
        }

        #[test]
        fn test_save_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("deeper").join("slot.json");
            let store = TimerStateStore::new(&path);

            store.save(&sample_state()).unwrap();
            assert!(path.exists());
        }

        #[test]
        fn test_save_leaves_no_temp_file() {
            let (dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);
            store.save(&sample_state()).unwrap();

            let entries: Vec<_> = fs::read_dir(dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name())
                .collect();
            assert_eq!(entries, vec![std::ffi::OsString::from("workbench-timer.json")]);
        }

        #[test]
        fn test_load_normalizes_inconsistent_activation() {
            let (_dir, path) = temp_slot();
            fs::write(
                &path,
                r#"{"projects":[{"id":1,"title":"A"}],"seconds":{"1":3},"activeProject":1,"lastStart":null}"#,
            )
            .unwrap();

            let state = TimerStateStore::new(&path).load();
            assert!(!state.is_running());
            assert_eq!(state.seconds_for(1), 3);
        }

        #[test]
        fn test_save_to_directory_path_fails() {
            let dir = tempfile::tempdir().unwrap();
            let store = TimerStateStore::new(dir.path());

            let result = store.save(&sample_state());
            assert!(matches!(result, Err(StoreError::Write { .. })));
        }
    }

    // ------------------------------------------------------------------------
    // subscribe / refresh Tests
    // ------------------------------------------------------------------------

    mod subscription_tests {
        use super::*;

        #[test]
        fn test_own_write_is_not_delivered() {
            let (_dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);
            let seen = recording(&store);

            store.save(&sample_state()).unwrap();

            assert_eq!(store.refresh(), None);
            assert!(seen.lock().unwrap().is_empty());
        }

        #[test]
        fn test_repeated_external_content_is_delivered_again() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);
            let seen = recording(&ours);

            ours.save(&TimerState::default()).unwrap();
            theirs.save(&sample_state()).unwrap();
            assert_eq!(ours.refresh(), Some(sample_state()));

            // Same content as our earlier write, but written by them.
            theirs.save(&TimerState::default()).unwrap();
            assert_eq!(ours.refresh(), Some(TimerState::default()));
            assert_eq!(seen.lock().unwrap().len(), 2);
        }

        #[test]
        fn test_own_write_after_external_is_not_delivered() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);
            let seen = recording(&ours);

            theirs.save(&sample_state()).unwrap();
            ours.save(&TimerState::default()).unwrap();

            // The change event for their write now reads our content.
            assert_eq!(ours.refresh(), None);
            assert!(seen.lock().unwrap().is_empty());
        }

        #[test]
        fn test_is_latest_tracks_newest_content() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);

            assert!(!ours.is_latest(&TimerState::default()));

            theirs.save(&sample_state()).unwrap();
            let delivered = ours.refresh().unwrap();
            assert!(ours.is_latest(&delivered));

            ours.save(&TimerState::default()).unwrap();
            assert!(!ours.is_latest(&delivered));
            assert!(ours.is_latest(&TimerState::default()));
        }

        #[test]
        fn test_external_write_is_delivered_once() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);
            let seen = recording(&ours);

            theirs.save(&sample_state()).unwrap();

            assert_eq!(ours.refresh(), Some(sample_state()));
            assert_eq!(ours.refresh(), None);
            assert_eq!(seen.lock().unwrap().as_slice(), &[sample_state()]);
        }

        #[test]
        fn test_malformed_external_write_is_ignored() {
            let (_dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);
            let seen = recording(&store);

            fs::write(&path, "garbage").unwrap();

            assert_eq!(store.refresh(), None);
            assert!(seen.lock().unwrap().is_empty());
        }

        #[test]
        fn test_missing_slot_on_refresh_is_ignored() {
            let (_dir, path) = temp_slot();
            let store = TimerStateStore::new(&path);
            let seen = recording(&store);

            assert_eq!(store.refresh(), None);
            assert!(seen.lock().unwrap().is_empty());
        }

        #[test]
        fn test_loaded_payload_is_not_redelivered() {
            let (_dir, path) = temp_slot();
            TimerStateStore::new(&path).save(&sample_state()).unwrap();

            let store = TimerStateStore::new(&path);
            let seen = recording(&store);
            store.load();

            assert_eq!(store.refresh(), None);
            assert!(seen.lock().unwrap().is_empty());
        }

        #[test]
        fn test_unsubscribe_stops_delivery() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);

            let seen = Arc::new(Mutex::new(0usize));
            let counter = Arc::clone(&seen);
            let id = ours.subscribe(move |_| *counter.lock().unwrap() += 1);

            assert!(ours.unsubscribe(id));
            assert!(!ours.unsubscribe(id));

            theirs.save(&sample_state()).unwrap();
            ours.refresh();
            assert_eq!(*seen.lock().unwrap(), 0);
        }

        #[test]
        fn test_every_subscriber_receives_state() {
            let (_dir, path) = temp_slot();
            let ours = TimerStateStore::new(&path);
            let theirs = TimerStateStore::new(&path);
            let first = recording(&ours);
            let second = recording(&ours);

            theirs.save(&TimerState::default()).unwrap();
            ours.refresh();

            assert_eq!(first.lock().unwrap().len(), 1);
            assert_eq!(second.lock().unwrap().len(), 1);
        }
    }
}
