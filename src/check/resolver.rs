//! Related-file resolution
//!
//! Computes which files must be re-checked when a check is triggered from a
//! file and cursor line: the trigger itself, files the trigger's previous
//! checks left with errors, and files referencing the symbol under the cursor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::check::editor::Editor;
use crate::check::navtree::find_node_at;
use crate::check::store::DiagnosticsStore;
use crate::check::types::{CheckList, SourceFilter};
use crate::session::AnalysisSession;
use crate::session::protocol::{Location, NavigationTree};

pub struct RelatedFileResolver {
    session: Arc<dyn AnalysisSession>,
    editor: Arc<dyn Editor>,
    store: Arc<DiagnosticsStore>,
    filter: SourceFilter,
}

impl RelatedFileResolver {
    pub fn new(
        session: Arc<dyn AnalysisSession>,
        editor: Arc<dyn Editor>,
        store: Arc<DiagnosticsStore>,
        filter: SourceFilter,
    ) -> Self {
        Self {
            session,
            editor,
            store,
            filter,
        }
    }

    /// Build the check list for `trigger` with the cursor on `cursor_line` (1-based)
    ///
    /// Returns an empty list when the trigger is outside every project or is
    /// not a source file. Failed lookups only shrink the list.
    pub async fn resolve(&self, trigger: &Path, cursor_line: u32) -> CheckList {
        if self.editor.project_root(trigger).is_none() {
            debug!("No project root for {:?}, nothing to check", trigger);
            return CheckList::empty();
        }
        if !self.filter.is_source_file(trigger) {
            debug!("{:?} is not a source file, nothing to check", trigger);
            return CheckList::empty();
        }

        let mut related: Vec<PathBuf> = self.store.attributed_files(trigger);

        let tree = self.navtree(trigger).await;
        let name_location = tree
            .as_ref()
            .and_then(|tree| find_node_at(tree, cursor_line))
            .and_then(|node| node.name_span)
            .map(|span| span.start);

        if let Some(location) = name_location {
            related.extend(self.referencing_files(trigger, location).await);
        }

        related.retain(|path| self.filter.is_source_file(path));

        let list = CheckList::new(trigger.to_path_buf(), related);
        debug!("Resolved {} file(s) to check for {:?}", list.len(), trigger);
        list
    }

    async fn navtree(&self, file: &Path) -> Option<NavigationTree> {
        match self.session.navtree(file).await {
            Ok(tree) => tree,
            Err(e) => {
                warn!("navtree failed for {:?}: {}", file, e);
                None
            }
        }
    }

    async fn referencing_files(&self, file: &Path, location: Location) -> Vec<PathBuf> {
        match self.session.references(file, location).await {
            Ok(Some(body)) => body
                .refs
                .into_iter()
                .map(|reference| PathBuf::from(reference.file))
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("references failed for {:?}: {}", file, e);
                Vec::new()
            }
        }
    }
}
