//! Entry point of a related-files check

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::check::busy::BusySignal;
use crate::check::driver::{CycleReport, DiagnosticsDriver};
use crate::check::editor::Editor;
use crate::check::error::CheckError;
use crate::check::resolver::RelatedFileResolver;
use crate::check::store::DiagnosticsStore;
use crate::check::tracker::OpenFileTracker;
use crate::check::types::SourceFilter;
use crate::config::{CHECK_RELATED_FILES_LABEL, CheckConfig};
use crate::session::AnalysisSession;

pub struct RelatedFilesChecker {
    resolver: RelatedFileResolver,
    driver: DiagnosticsDriver,
    busy: BusySignal,
}

impl RelatedFilesChecker {
    pub fn new(
        session: Arc<dyn AnalysisSession>,
        editor: Arc<dyn Editor>,
        tracker: Arc<OpenFileTracker>,
        store: Arc<DiagnosticsStore>,
        busy: BusySignal,
        config: &CheckConfig,
    ) -> Self {
        Self {
            resolver: RelatedFileResolver::new(
                session.clone(),
                editor.clone(),
                store.clone(),
                SourceFilter::new(config.source_extensions.iter().cloned()),
            ),
            driver: DiagnosticsDriver::new(
                session,
                editor,
                tracker,
                store,
                config.concurrent_diagnostics,
            ),
            busy,
        }
    }

    /// Check `trigger` and every file related to the symbol on `cursor_line` (1-based)
    pub async fn check(&self, trigger: &Path, cursor_line: u32) -> Result<CycleReport, CheckError> {
        self.busy
            .report_busy_while(CHECK_RELATED_FILES_LABEL, async {
                let list = self.resolver.resolve(trigger, cursor_line).await;
                if list.is_empty() {
                    return Ok::<_, CheckError>(CycleReport::default());
                }

                let report = self.driver.run(trigger, &list).await?;
                info!(
                    "Checked {} file(s) for {:?} ({} failed)",
                    report.checked.len(),
                    trigger,
                    report.failed.len()
                );
                Ok(report)
            })
            .await
    }
}
