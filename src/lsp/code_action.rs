//! Code action generation from tsserver code fixes

use std::collections::HashMap;
use std::path::Path;

use tower_lsp::lsp_types::{CodeAction, CodeActionKind, TextEdit, Url, WorkspaceEdit};
use tracing::warn;

use crate::lsp::diagnostics::to_lsp_position;
use crate::session::protocol::CodeFixAction;

/// Convert a code fix into a quick fix carrying its workspace edit
///
/// Returns None when none of the changed files can be addressed by URL.
pub fn to_code_action(fix: &CodeFixAction) -> Option<CodeAction> {
    let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();

    for file in &fix.changes {
        let Ok(uri) = Url::from_file_path(Path::new(&file.file_name)) else {
            warn!("Skipping edit for non-absolute path {:?}", file.file_name);
            continue;
        };

        let edits = file.text_changes.iter().map(|change| TextEdit {
            range: tower_lsp::lsp_types::Range {
                start: to_lsp_position(change.start),
                end: to_lsp_position(change.end),
            },
            new_text: change.new_text.clone(),
        });
        changes.entry(uri).or_default().extend(edits);
    }

    if changes.is_empty() {
        return None;
    }

    Some(CodeAction {
        title: fix.description.clone(),
        kind: Some(CodeActionKind::QUICKFIX),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }),
        ..Default::default()
    })
}
