//! Filesystem change subscriptions for tracked files
//!
//! A [`WatchHandle`] is the subscription: dropping it unsubscribes, so a
//! handle owned by exactly one tracker entry is released exactly once.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::check::error::WatchError;

/// Kind of change observed on a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    Changed,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// A live subscription for one path
pub struct WatchHandle {
    path: PathBuf,
    release: Option<Release>,
}

impl WatchHandle {
    pub fn new(path: PathBuf, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            path,
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release (used when watching is unavailable)
    pub fn detached(path: PathBuf) -> Self {
        Self {
            path,
            release: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("path", &self.path)
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Trait for subscribing to changes of a single file
pub trait FileWatcher: Send + Sync {
    fn watch(&self, path: &Path) -> Result<WatchHandle, WatchError>;
}

/// FileWatcher that never reports anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWatcher;

impl FileWatcher for NoopWatcher {
    fn watch(&self, path: &Path) -> Result<WatchHandle, WatchError> {
        Ok(WatchHandle::detached(path.to_path_buf()))
    }
}

/// FileWatcher backed by the platform's recommended notify watcher
pub struct NotifyWatcher {
    inner: Arc<Mutex<RecommendedWatcher>>,
}

impl NotifyWatcher {
    /// Create a watcher that forwards events for watched files to `events`
    pub fn new(events: mpsc::UnboundedSender<FileEvent>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("File watcher error: {}", e);
                    return;
                }
            };

            let Some(kind) = classify(&event.kind) else {
                return;
            };

            for path in event.paths {
                let _ = events.send(FileEvent { path, kind });
            }
        })?;

        Ok(Self {
            inner: Arc::new(Mutex::new(watcher)),
        })
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(&self, path: &Path) -> Result<WatchHandle, WatchError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watch(path, RecursiveMode::NonRecursive)?;

        let inner = Arc::clone(&self.inner);
        let watched = path.to_path_buf();
        Ok(WatchHandle::new(path.to_path_buf(), move || {
            let result = inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .unwatch(&watched);
            // A deleted file has already dropped its watch
            if let Err(e) = result {
                debug!("Failed to unwatch {:?}: {}", watched, e);
            }
        }))
    }
}

fn classify(kind: &EventKind) -> Option<FileEventKind> {
    match kind {
        EventKind::Remove(_) => Some(FileEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FileEventKind::Renamed),
        EventKind::Modify(_) | EventKind::Create(_) => Some(FileEventKind::Changed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
