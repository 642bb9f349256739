//! Open-file state tracker
//!
//! Owns the answer to "does the analysis service have this file open?".
//! Every open and close sent to the service goes through here, so the
//! tracker never disagrees with the service about files it issued commands for.
//!
//! Check cycles register interest in the files they need through
//! [`OpenFileTracker::ensure_open`] and get a [`SpeculativeLease`] back.
//! Returning the lease to [`OpenFileTracker::release_speculative`] withdraws
//! that interest; a file is closed once no cycle is interested in it and the
//! editor does not have it open. Overlapping cycles therefore never close a
//! file out from under each other. A lease dropped without being released
//! (a cancelled check) gives its interest back the next time the tracker is
//! used, and the following sweep closes its files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use indexmap::IndexMap;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tracing::{debug, info, warn};

use crate::check::watcher::{FileEvent, FileEventKind, FileWatcher, WatchHandle};
use crate::session::protocol::{OpenRequestArgs, UpdateOpenArgs};
use crate::session::{AnalysisSession, SessionError};

/// Paths of leases dropped without being released
type Abandoned = StdMutex<Vec<PathBuf>>;

/// Interest a single check cycle holds in tracked files
///
/// Should be handed back to [`OpenFileTracker::release_speculative`].
#[derive(Debug)]
#[must_use = "a lease keeps its files open until it is released"]
pub struct SpeculativeLease {
    paths: Vec<PathBuf>,
    abandoned: Weak<Abandoned>,
}

impl SpeculativeLease {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for SpeculativeLease {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        if let Some(abandoned) = self.abandoned.upgrade() {
            debug!("Lease of {} file(s) dropped unreleased", self.paths.len());
            abandoned
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .append(&mut self.paths);
        }
    }
}

#[derive(Debug)]
struct TrackedFile {
    project_root: Option<PathBuf>,
    /// Number of check cycles holding a lease on this file
    interest: usize,
    editor_owned: bool,
    _watch: WatchHandle,
}

impl TrackedFile {
    fn open_args(&self, path: &Path) -> OpenRequestArgs {
        open_args(path, self.project_root.as_deref())
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    files: IndexMap<PathBuf, TrackedFile>,
}

impl TrackerState {
    /// The only way an entry leaves the map; dropping it releases the watch
    fn remove(&mut self, path: &Path) -> Option<TrackedFile> {
        let removed = self.files.shift_remove(path);
        if removed.is_some() {
            debug!("Stopped tracking {:?}", path);
        }
        removed
    }

    fn withdraw(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if let Some(entry) = self.files.get_mut(path) {
                entry.interest = entry.interest.saturating_sub(1);
            }
        }
    }
}

pub struct OpenFileTracker {
    session: Arc<dyn AnalysisSession>,
    watcher: Arc<dyn FileWatcher>,
    state: Mutex<TrackerState>,
    abandoned: Arc<Abandoned>,
}

impl OpenFileTracker {
    pub fn new(session: Arc<dyn AnalysisSession>, watcher: Arc<dyn FileWatcher>) -> Self {
        Self {
            session,
            watcher,
            state: Mutex::new(TrackerState::default()),
            abandoned: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    /// Lock the state after withdrawing the interest of dropped leases
    async fn lock(&self) -> MutexGuard<'_, TrackerState> {
        let mut state = self.state.lock().await;
        let abandoned = std::mem::take(
            &mut *self
                .abandoned
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if !abandoned.is_empty() {
            state.withdraw(&abandoned);
        }
        state
    }

    fn lease(&self, paths: Vec<PathBuf>) -> SpeculativeLease {
        SpeculativeLease {
            paths,
            abandoned: Arc::downgrade(&self.abandoned),
        }
    }

    /// Make sure the service has every path open and register interest in them
    ///
    /// Untracked paths are opened with one batched command. Already tracked
    /// paths cost nothing. On failure the interest taken by this call is
    /// withdrawn, but the new entries stay so the next release closes them.
    pub async fn ensure_open(
        &self,
        paths: &[PathBuf],
        project_root: Option<&Path>,
    ) -> Result<SpeculativeLease, SessionError> {
        self.ensure_open_with_editor(paths, project_root, &HashSet::new())
            .await
    }

    /// [`ensure_open`](Self::ensure_open) for a cycle running next to the editor
    ///
    /// Paths in `editor_open` are leased only if already tracked, so an editor
    /// close during the cycle leaves them open. Untracked ones are left to the
    /// editor: neither opened nor leased.
    pub async fn ensure_open_with_editor(
        &self,
        paths: &[PathBuf],
        project_root: Option<&Path>,
        editor_open: &HashSet<PathBuf>,
    ) -> Result<SpeculativeLease, SessionError> {
        let mut state = self.lock().await;

        let mut leased: Vec<PathBuf> = Vec::with_capacity(paths.len());
        let mut to_open = Vec::new();
        for path in paths {
            if leased.contains(path) {
                continue;
            }
            match state.files.get_mut(path) {
                Some(entry) => entry.interest += 1,
                None if editor_open.contains(path) => continue,
                None => {
                    state.files.insert(
                        path.clone(),
                        TrackedFile {
                            project_root: project_root.map(Path::to_path_buf),
                            interest: 1,
                            editor_owned: false,
                            _watch: self.watch(path),
                        },
                    );
                    to_open.push(open_args(path, project_root));
                }
            }
            leased.push(path.clone());
        }

        if !to_open.is_empty() {
            debug!("Opening {} file(s) for check", to_open.len());
            if let Err(e) = self.session.update_open(UpdateOpenArgs::open(to_open)).await {
                state.withdraw(&leased);
                return Err(e);
            }
        }

        Ok(self.lease(leased))
    }

    /// Withdraw a cycle's interest and close files nobody needs any more
    ///
    /// Sweeps every tracked file that has no interest left, is not
    /// editor-owned and is not in `editor_open`, closing them in one batch.
    /// On failure nothing is dropped.
    pub async fn release_speculative(
        &self,
        mut lease: SpeculativeLease,
        editor_open: &HashSet<PathBuf>,
    ) -> Result<(), SessionError> {
        let mut state = self.lock().await;
        state.withdraw(&std::mem::take(&mut lease.paths));

        let closing: Vec<PathBuf> = state
            .files
            .iter()
            .filter(|(path, entry)| {
                entry.interest == 0 && !entry.editor_owned && !editor_open.contains(*path)
            })
            .map(|(path, _)| path.clone())
            .collect();

        if closing.is_empty() {
            return Ok(());
        }

        debug!("Closing {} speculatively opened file(s)", closing.len());
        self.session
            .update_open(UpdateOpenArgs::close(
                closing.iter().map(|path| path_arg(path)).collect(),
            ))
            .await?;

        for path in &closing {
            state.remove(path);
        }
        Ok(())
    }

    /// The editor opened `path`
    pub async fn editor_opened(
        &self,
        path: &Path,
        project_root: Option<&Path>,
    ) -> Result<(), SessionError> {
        let mut state = self.lock().await;

        if let Some(entry) = state.files.get_mut(path) {
            entry.editor_owned = true;
            return Ok(());
        }

        self.session
            .update_open(UpdateOpenArgs::open(vec![open_args(path, project_root)]))
            .await?;

        state.files.insert(
            path.to_path_buf(),
            TrackedFile {
                project_root: project_root.map(Path::to_path_buf),
                interest: 0,
                editor_owned: true,
                _watch: self.watch(path),
            },
        );
        Ok(())
    }

    /// The editor closed `path`; it is closed unless a cycle still needs it
    pub async fn editor_closed(&self, path: &Path) -> Result<(), SessionError> {
        let mut state = self.lock().await;

        let Some(entry) = state.files.get_mut(path) else {
            return Ok(());
        };
        entry.editor_owned = false;
        if entry.interest > 0 {
            return Ok(());
        }

        self.session
            .update_open(UpdateOpenArgs::close(vec![path_arg(path)]))
            .await?;
        state.remove(path);
        Ok(())
    }

    /// Make the service re-read a tracked file that changed on disk
    pub async fn on_file_changed(&self, path: &Path) -> Result<(), SessionError> {
        self.reopen(path).await
    }

    pub async fn on_file_renamed(&self, path: &Path) -> Result<(), SessionError> {
        self.reopen(path).await
    }

    /// Close a tracked file that was deleted and stop tracking it
    ///
    /// The entry is dropped even when the close command fails.
    pub async fn on_file_deleted(&self, path: &Path) -> Result<(), SessionError> {
        let mut state = self.lock().await;
        if !state.files.contains_key(path) {
            return Ok(());
        }

        let result = self
            .session
            .update_open(UpdateOpenArgs::close(vec![path_arg(path)]))
            .await;
        state.remove(path);
        result
    }

    /// Drop every entry and its subscription without talking to the service
    pub async fn dispose(&self) {
        let mut state = self.lock().await;
        let paths: Vec<PathBuf> = state.files.keys().cloned().collect();
        for path in &paths {
            state.remove(path);
        }
        info!("Disposed open-file tracker ({} file(s))", paths.len());
    }

    pub async fn is_tracked(&self, path: &Path) -> bool {
        self.lock().await.files.contains_key(path)
    }

    /// Tracked paths in the order they were first opened
    pub async fn tracked_paths(&self) -> Vec<PathBuf> {
        self.lock().await.files.keys().cloned().collect()
    }

    /// Number of cycles interested in `path`, or `None` if it is not tracked
    pub async fn interest(&self, path: &Path) -> Option<usize> {
        self.lock()
            .await
            .files
            .get(path)
            .map(|entry| entry.interest)
    }

    async fn reopen(&self, path: &Path) -> Result<(), SessionError> {
        let state = self.lock().await;
        let Some(entry) = state.files.get(path) else {
            return Ok(());
        };

        self.session
            .update_open(UpdateOpenArgs::close(vec![path_arg(path)]))
            .await?;
        self.session
            .update_open(UpdateOpenArgs::open(vec![entry.open_args(path)]))
            .await
    }

    fn watch(&self, path: &Path) -> WatchHandle {
        self.watcher.watch(path).unwrap_or_else(|e| {
            warn!("Failed to watch {:?}: {}", path, e);
            WatchHandle::detached(path.to_path_buf())
        })
    }
}

/// Dispatch watcher events to the tracker until the channel closes
pub async fn run_file_events(
    tracker: Arc<OpenFileTracker>,
    mut events: mpsc::UnboundedReceiver<FileEvent>,
) {
    while let Some(FileEvent { path, kind }) = events.recv().await {
        let result = match kind {
            FileEventKind::Changed => tracker.on_file_changed(&path).await,
            FileEventKind::Renamed => tracker.on_file_renamed(&path).await,
            FileEventKind::Deleted => tracker.on_file_deleted(&path).await,
        };
        if let Err(e) = result {
            warn!("Failed to handle {:?} event for {:?}: {}", kind, path, e);
        }
    }
    debug!("File event channel closed");
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn open_args(path: &Path, project_root: Option<&Path>) -> OpenRequestArgs {
    OpenRequestArgs {
        file: path_arg(path),
        project_root_path: project_root.map(path_arg),
    }
}
