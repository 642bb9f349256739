//! Diagnostics store
//!
//! Keeps the latest diagnostics per file and kind, remembers which trigger
//! file's check wrote them, and broadcasts the path of every file whose
//! diagnostics changed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexSet;
use tokio::sync::broadcast;
use tracing::debug;

use crate::session::protocol::{Diagnostic, Location, TextSpan};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Kind of diagnostics, mirroring tsserver's diagnostic events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    Syntactic,
    Semantic,
    Suggestion,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 3] = [
        DiagnosticKind::Syntactic,
        DiagnosticKind::Semantic,
        DiagnosticKind::Suggestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Syntactic => "syntaxDiag",
            DiagnosticKind::Semantic => "semanticDiag",
            DiagnosticKind::Suggestion => "suggestionDiag",
        }
    }
}

/// One write into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiagnostics {
    pub file: PathBuf,
    /// File whose check produced these diagnostics
    pub trigger: Option<PathBuf>,
    pub kind: DiagnosticKind,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
struct Entry {
    trigger: Option<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
struct StoreState {
    errors: HashMap<PathBuf, HashMap<DiagnosticKind, Entry>>,
    /// trigger -> files carrying diagnostics because of that trigger
    attribution: HashMap<PathBuf, IndexSet<PathBuf>>,
}

impl StoreState {
    fn has_errors(&self, file: &Path) -> bool {
        self.errors
            .get(file)
            .is_some_and(|kinds| kinds.values().any(|entry| !entry.diagnostics.is_empty()))
    }

    fn detach(&mut self, file: &Path) {
        self.attribution.retain(|_, files| {
            files.shift_remove(file);
            !files.is_empty()
        });
    }
}

pub struct DiagnosticsStore {
    state: RwLock<StoreState>,
    changes: broadcast::Sender<PathBuf>,
}

impl Default for DiagnosticsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            changes,
        }
    }

    /// Receive the path of every file whose diagnostics are written
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.changes.subscribe()
    }

    /// Replace the diagnostics of one kind for `file` without attribution
    pub fn set_errors(&self, kind: DiagnosticKind, file: &Path, diagnostics: Vec<Diagnostic>) {
        self.push(FileDiagnostics {
            file: file.to_path_buf(),
            trigger: None,
            kind,
            diagnostics,
        });
    }

    /// Replace the diagnostics of one kind for a file (last writer wins)
    ///
    /// Non-empty diagnostics written by a check attribute the file to its
    /// trigger. Once the file has no diagnostics left it is attributed to
    /// no trigger at all.
    pub fn push(&self, update: FileDiagnostics) {
        let FileDiagnostics {
            file,
            trigger,
            kind,
            diagnostics,
        } = update;
        debug!(
            "{} for {:?}: {} diagnostic(s)",
            kind.as_str(),
            file,
            diagnostics.len()
        );

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

            if let Some(trigger) = &trigger
                && !diagnostics.is_empty()
            {
                state
                    .attribution
                    .entry(trigger.clone())
                    .or_default()
                    .insert(file.clone());
            }

            state.errors.entry(file.clone()).or_default().insert(
                kind,
                Entry {
                    trigger,
                    diagnostics,
                },
            );

            if !state.has_errors(&file) {
                state.detach(&file);
            }
        }

        // No receivers just means nobody is publishing yet
        let _ = self.changes.send(file);
    }

    /// Files that carry diagnostics because of a check of `trigger`
    pub fn attributed_files(&self, trigger: &Path) -> Vec<PathBuf> {
        self.read()
            .attribution
            .get(trigger)
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every diagnostic of `file`, syntactic first
    pub fn errors_for_file(&self, file: &Path) -> Vec<Diagnostic> {
        let state = self.read();
        let Some(kinds) = state.errors.get(file) else {
            return Vec::new();
        };

        DiagnosticKind::ALL
            .iter()
            .filter_map(|kind| kinds.get(kind))
            .flat_map(|entry| entry.diagnostics.iter().cloned())
            .collect()
    }

    /// Diagnostics of `file` whose span contains `location`
    pub fn errors_at(&self, file: &Path, location: Location) -> Vec<Diagnostic> {
        self.errors_for_file(file)
            .into_iter()
            .filter(|diagnostic| diagnostic.span().contains(location))
            .collect()
    }

    /// Diagnostics of `file` whose span intersects `span`
    pub fn errors_in_range(&self, file: &Path, span: &TextSpan) -> Vec<Diagnostic> {
        self.errors_for_file(file)
            .into_iter()
            .filter(|diagnostic| diagnostic.span().intersects(span))
            .collect()
    }

    /// The trigger whose check last wrote `kind` diagnostics for `file`
    pub fn trigger_of(&self, file: &Path, kind: DiagnosticKind) -> Option<PathBuf> {
        self.read()
            .errors
            .get(file)
            .and_then(|kinds| kinds.get(&kind))
            .and_then(|entry| entry.trigger.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
