//! Scripted analysis session for tests

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use related_files_lsp::session::protocol::{
    CodeFixAction, CodeFixRequestArgs, Diagnostic, Location, NavigationTree, ReferenceEntry,
    ReferencesResponseBody, TextSpan, UpdateOpenArgs,
};
use related_files_lsp::session::{AnalysisSession, SessionError};

/// Session answering from fixed data and recording what it was asked
#[derive(Default)]
pub struct FakeSession {
    navtrees: HashMap<PathBuf, NavigationTree>,
    references: HashMap<PathBuf, Vec<String>>,
    diagnostics: Mutex<HashMap<PathBuf, Vec<Diagnostic>>>,
    failing: HashSet<PathBuf>,
    barriers: HashMap<PathBuf, Arc<Barrier>>,
    supported_fixes: Vec<String>,
    code_fixes: HashMap<i32, Vec<CodeFixAction>>,
    update_open_calls: Mutex<Vec<UpdateOpenArgs>>,
    diagnostics_requests: Mutex<Vec<PathBuf>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_navtree(mut self, file: &str, tree: NavigationTree) -> Self {
        self.navtrees.insert(PathBuf::from(file), tree);
        self
    }

    pub fn with_references(mut self, file: &str, referencing: &[&str]) -> Self {
        self.references.insert(
            PathBuf::from(file),
            referencing.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn with_diagnostics(self, file: &str, diagnostics: Vec<Diagnostic>) -> Self {
        self.set_diagnostics(file, diagnostics);
        self
    }

    /// `semanticDiagnosticsSync` for `file` fails
    pub fn failing_diagnostics(mut self, file: &str) -> Self {
        self.failing.insert(PathBuf::from(file));
        self
    }

    /// `semanticDiagnosticsSync` for `file` waits on `barrier` before answering
    pub fn with_barrier(mut self, file: &str, barrier: Arc<Barrier>) -> Self {
        self.barriers.insert(PathBuf::from(file), barrier);
        self
    }

    pub fn with_code_fix(mut self, code: i32, fix: CodeFixAction) -> Self {
        self.supported_fixes.push(code.to_string());
        self.code_fixes.entry(code).or_default().push(fix);
        self
    }

    pub fn set_diagnostics(&self, file: &str, diagnostics: Vec<Diagnostic>) {
        self.diagnostics
            .lock()
            .unwrap()
            .insert(PathBuf::from(file), diagnostics);
    }

    pub fn update_open_calls(&self) -> Vec<UpdateOpenArgs> {
        self.update_open_calls.lock().unwrap().clone()
    }

    /// Every file opened, in command order
    pub fn opened_files(&self) -> Vec<String> {
        self.update_open_calls()
            .into_iter()
            .flat_map(|call| call.open_files.into_iter().map(|f| f.file))
            .collect()
    }

    /// Every file closed, in command order
    pub fn closed_files(&self) -> Vec<String> {
        self.update_open_calls()
            .into_iter()
            .flat_map(|call| call.closed_files)
            .collect()
    }

    pub fn diagnostics_requests(&self) -> Vec<PathBuf> {
        self.diagnostics_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisSession for FakeSession {
    async fn navtree(&self, file: &Path) -> Result<Option<NavigationTree>, SessionError> {
        Ok(self.navtrees.get(file).cloned())
    }

    async fn references(
        &self,
        file: &Path,
        _location: Location,
    ) -> Result<Option<ReferencesResponseBody>, SessionError> {
        Ok(self.references.get(file).map(|files| ReferencesResponseBody {
            refs: files
                .iter()
                .map(|file| ReferenceEntry {
                    file: file.clone(),
                    start: Location::new(1, 1),
                    end: Location::new(1, 2),
                    is_definition: false,
                })
                .collect(),
            symbol_name: String::new(),
        }))
    }

    async fn update_open(&self, args: UpdateOpenArgs) -> Result<(), SessionError> {
        self.update_open_calls.lock().unwrap().push(args);
        Ok(())
    }

    async fn semantic_diagnostics_sync(
        &self,
        file: &Path,
    ) -> Result<Option<Vec<Diagnostic>>, SessionError> {
        self.diagnostics_requests
            .lock()
            .unwrap()
            .push(file.to_path_buf());

        if let Some(barrier) = self.barriers.get(file) {
            barrier.wait().await;
        }
        if self.failing.contains(file) {
            return Err(SessionError::Closed);
        }
        Ok(self.diagnostics.lock().unwrap().get(file).cloned())
    }

    async fn supported_code_fixes(&self) -> Result<Option<Vec<String>>, SessionError> {
        Ok(Some(self.supported_fixes.clone()))
    }

    async fn code_fixes(
        &self,
        args: CodeFixRequestArgs,
    ) -> Result<Option<Vec<CodeFixAction>>, SessionError> {
        let fixes: Vec<CodeFixAction> = args
            .error_codes
            .iter()
            .filter_map(|code| self.code_fixes.get(code))
            .flatten()
            .cloned()
            .collect();
        Ok(Some(fixes))
    }
}

fn span(start: (u32, u32), end: (u32, u32)) -> TextSpan {
    TextSpan::new(Location::new(start.0, start.1), Location::new(end.0, end.1))
}

/// Module tree with one function named `name` spanning `lines`
pub fn function_tree(name: &str, lines: (u32, u32)) -> NavigationTree {
    NavigationTree {
        text: "module".to_string(),
        kind: "module".to_string(),
        spans: vec![span((1, 1), (lines.1 + 10, 1))],
        child_items: vec![NavigationTree {
            text: name.to_string(),
            kind: "function".to_string(),
            spans: vec![span((lines.0, 1), (lines.1, 2))],
            name_span: Some(span((lines.0, 17), (lines.0, 17 + name.len() as u32))),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn error(line: u32, code: i32) -> Diagnostic {
    Diagnostic {
        start: Location::new(line, 1),
        end: Location::new(line, 10),
        text: format!("error TS{code}"),
        code: Some(code),
        category: "error".to_string(),
    }
}
