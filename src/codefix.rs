//! Code fixes for diagnostics recorded in the store

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::check::store::DiagnosticsStore;
use crate::session::protocol::{CodeFixAction, CodeFixRequestArgs, Diagnostic, Location, TextSpan};
use crate::session::{AnalysisSession, SessionError};

#[derive(Debug, Error)]
pub enum CodefixError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("No code fixes are supported")]
    NoSupportedFixes,
}

pub struct CodefixProvider {
    session: Arc<dyn AnalysisSession>,
    store: Arc<DiagnosticsStore>,
    supported: OnceCell<HashSet<i32>>,
}

impl CodefixProvider {
    pub fn new(session: Arc<dyn AnalysisSession>, store: Arc<DiagnosticsStore>) -> Self {
        Self {
            session,
            store,
            supported: OnceCell::new(),
        }
    }

    /// Error codes the service can fix, fetched once per provider
    pub async fn supported_fixes(&self) -> Result<&HashSet<i32>, CodefixError> {
        self.supported
            .get_or_try_init(|| async {
                let codes = self
                    .session
                    .supported_code_fixes()
                    .await?
                    .ok_or(CodefixError::NoSupportedFixes)?;
                debug!("{} fixable error codes", codes.len());
                Ok::<_, CodefixError>(
                    codes
                        .iter()
                        .filter_map(|code| code.parse::<i32>().ok())
                        .collect::<HashSet<_>>(),
                )
            })
            .await
    }

    /// Spans of stored errors within `span` that have a fix
    pub async fn fixable_ranges(
        &self,
        file: &Path,
        span: &TextSpan,
    ) -> Result<Vec<TextSpan>, CodefixError> {
        let supported = self.supported_fixes().await?;
        Ok(self
            .store
            .errors_in_range(file, span)
            .iter()
            .filter(|error| is_fixable(error, supported))
            .map(Diagnostic::span)
            .collect())
    }

    /// Fixes for every fixable error at `location`
    pub async fn run_code_fix(
        &self,
        file: &Path,
        location: Location,
    ) -> Result<Vec<CodeFixAction>, CodefixError> {
        let errors = self.store.errors_at(file, location);
        self.fixes_for(file, errors).await
    }

    /// Fixes for every fixable error intersecting `span`
    pub async fn run_code_fixes_in_range(
        &self,
        file: &Path,
        span: &TextSpan,
    ) -> Result<Vec<CodeFixAction>, CodefixError> {
        let errors = self.store.errors_in_range(file, span);
        self.fixes_for(file, errors).await
    }

    async fn fixes_for(
        &self,
        file: &Path,
        errors: Vec<Diagnostic>,
    ) -> Result<Vec<CodeFixAction>, CodefixError> {
        let supported = self.supported_fixes().await?;

        let requests = errors
            .iter()
            .filter_map(|error| {
                let code = error.code.filter(|code| supported.contains(code))?;
                Some(CodeFixRequestArgs {
                    file: file.to_string_lossy().into_owned(),
                    start_line: error.start.line,
                    start_offset: error.start.offset,
                    end_line: error.end.line,
                    end_offset: error.end.offset,
                    error_codes: vec![code],
                })
            })
            .map(|args| self.session.code_fixes(args));

        let responses = try_join_all(requests).await?;
        Ok(responses.into_iter().flatten().flatten().collect())
    }
}

fn is_fixable(error: &Diagnostic, supported: &HashSet<i32>) -> bool {
    error.code.is_some_and(|code| supported.contains(&code))
}
