//! Diagnostics driver
//!
//! Runs one check cycle over a resolved [`CheckList`]: open what the service
//! does not have open yet, fetch semantic diagnostics for every file, record
//! them against the trigger, then release the speculative opens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::check::editor::Editor;
use crate::check::error::CheckError;
use crate::check::store::{DiagnosticKind, DiagnosticsStore, FileDiagnostics};
use crate::check::tracker::OpenFileTracker;
use crate::check::types::CheckList;
use crate::session::protocol::Diagnostic;
use crate::session::{AnalysisSession, SessionError};

/// Outcome of a check cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Files whose diagnostics were written, in check-list order
    pub checked: Vec<PathBuf>,
    /// Files whose diagnostics request failed (written as empty)
    pub failed: Vec<PathBuf>,
}

pub struct DiagnosticsDriver {
    session: Arc<dyn AnalysisSession>,
    editor: Arc<dyn Editor>,
    tracker: Arc<OpenFileTracker>,
    store: Arc<DiagnosticsStore>,
    concurrent: bool,
}

impl DiagnosticsDriver {
    pub fn new(
        session: Arc<dyn AnalysisSession>,
        editor: Arc<dyn Editor>,
        tracker: Arc<OpenFileTracker>,
        store: Arc<DiagnosticsStore>,
        concurrent: bool,
    ) -> Self {
        Self {
            session,
            editor,
            tracker,
            store,
            concurrent,
        }
    }

    pub async fn run(&self, trigger: &Path, list: &CheckList) -> Result<CycleReport, CheckError> {
        let mut report = CycleReport::default();
        if list.is_empty() {
            return Ok(report);
        }

        let project_root = self.editor.project_root(trigger);
        // Files the editor has open are already open in the service
        let editor_open = self.editor.open_file_paths(project_root.as_deref());
        let lease = self
            .tracker
            .ensure_open_with_editor(list.files(), project_root.as_deref(), &editor_open)
            .await
            .map_err(CheckError::Open)?;

        if self.concurrent {
            let results = join_all(list.iter().map(|file| self.fetch(file))).await;
            for (file, result) in list.iter().zip(results) {
                self.record(trigger, file, result, &mut report);
            }
        } else {
            for file in list {
                let result = self.fetch(file).await;
                self.record(trigger, file, result, &mut report);
            }
        }

        // The editor may have opened or closed files while we were fetching
        let editor_open = self.editor.open_file_paths(project_root.as_deref());
        self.tracker
            .release_speculative(lease, &editor_open)
            .await
            .map_err(CheckError::Close)?;

        Ok(report)
    }

    async fn fetch(&self, file: &Path) -> Result<Vec<Diagnostic>, SessionError> {
        debug!("Fetching semantic diagnostics for {:?}", file);
        Ok(self
            .session
            .semantic_diagnostics_sync(file)
            .await?
            .unwrap_or_default())
    }

    fn record(
        &self,
        trigger: &Path,
        file: &Path,
        result: Result<Vec<Diagnostic>, SessionError>,
        report: &mut CycleReport,
    ) {
        let diagnostics = result.unwrap_or_else(|e| {
            warn!("Failed to get diagnostics for {:?}: {}", file, e);
            report.failed.push(file.to_path_buf());
            Vec::new()
        });

        self.store.push(FileDiagnostics {
            file: file.to_path_buf(),
            trigger: Some(trigger.to_path_buf()),
            kind: DiagnosticKind::Semantic,
            diagnostics,
        });
        report.checked.push(file.to_path_buf());
    }
}
