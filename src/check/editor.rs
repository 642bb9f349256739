//! Editor capability: project roots and the set of files open in the editor

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Trait for querying the editor's view of the workspace
pub trait Editor: Send + Sync {
    /// The project root containing `path`, if any
    fn project_root(&self, path: &Path) -> Option<PathBuf>;

    /// Files currently open in the editor, limited to `project_root` when given
    fn open_file_paths(&self, project_root: Option<&Path>) -> HashSet<PathBuf>;
}

/// In-memory editor model: workspace roots plus open documents
///
/// The language server host keeps it current from `didOpen`/`didClose`.
#[derive(Debug, Default)]
pub struct WorkspaceEditor {
    roots: RwLock<Vec<PathBuf>>,
    open: RwLock<HashSet<PathBuf>>,
}

impl WorkspaceEditor {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: RwLock::new(roots),
            open: RwLock::new(HashSet::new()),
        }
    }

    pub fn set_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.write().unwrap_or_else(PoisonError::into_inner) = roots;
    }

    /// Record that the editor opened `path`. Returns false if it already was.
    pub fn open(&self, path: PathBuf) -> bool {
        self.open
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path)
    }

    /// Record that the editor closed `path`. Returns false if it was not open.
    pub fn close(&self, path: &Path) -> bool {
        self.open
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }
}

impl Editor for WorkspaceEditor {
    fn project_root(&self, path: &Path) -> Option<PathBuf> {
        // Nested roots: the deepest one wins
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned()
    }

    fn open_file_paths(&self, project_root: Option<&Path>) -> HashSet<PathBuf> {
        self.open
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|path| project_root.is_none_or(|root| path.starts_with(root)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_root_prefers_deepest_root() {
        let editor = WorkspaceEditor::new(vec![PathBuf::from("/p"), PathBuf::from("/p/packages/a")]);

        assert_eq!(
            editor.project_root(Path::new("/p/packages/a/src/index.ts")),
            Some(PathBuf::from("/p/packages/a"))
        );
        assert_eq!(
            editor.project_root(Path::new("/p/src/index.ts")),
            Some(PathBuf::from("/p"))
        );
    }

    #[test]
    fn project_root_is_none_outside_roots() {
        let editor = WorkspaceEditor::new(vec![PathBuf::from("/p")]);

        assert_eq!(editor.project_root(Path::new("/other/a.ts")), None);
        // prefix of a component is not containment
        assert_eq!(editor.project_root(Path::new("/pp/a.ts")), None);
    }

    #[test]
    fn open_file_paths_filters_by_root() {
        let editor = WorkspaceEditor::new(vec![PathBuf::from("/p"), PathBuf::from("/q")]);
        editor.open(PathBuf::from("/p/a.ts"));
        editor.open(PathBuf::from("/q/b.ts"));

        assert_eq!(
            editor.open_file_paths(Some(Path::new("/p"))),
            HashSet::from([PathBuf::from("/p/a.ts")])
        );
        assert_eq!(editor.open_file_paths(None).len(), 2);
    }

    #[test]
    fn close_removes_open_file() {
        let editor = WorkspaceEditor::default();
        assert!(editor.open(PathBuf::from("/p/a.ts")));
        assert!(!editor.open(PathBuf::from("/p/a.ts")));

        assert!(editor.close(Path::new("/p/a.ts")));
        assert!(!editor.close(Path::new("/p/a.ts")));
        assert!(editor.open_file_paths(None).is_empty());
    }
}
