//! AnalysisSession trait definition

use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::session::error::SessionError;
use crate::session::protocol::{
    CodeFixAction, CodeFixRequestArgs, Diagnostic, Location, NavigationTree,
    ReferencesResponseBody, UpdateOpenArgs,
};

/// Trait for issuing commands to a remote analysis service
///
/// Every call returns `Ok(None)` when the service answered without a body
/// ("no data") and `Err` when the call itself failed.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait AnalysisSession: Send + Sync {
    /// Fetches the navigation tree of `file`
    async fn navtree(&self, file: &Path) -> Result<Option<NavigationTree>, SessionError>;

    /// Finds all references to the symbol at `location` in `file`
    async fn references(
        &self,
        file: &Path,
        location: Location,
    ) -> Result<Option<ReferencesResponseBody>, SessionError>;

    /// Opens and/or closes files in one batch
    async fn update_open(&self, args: UpdateOpenArgs) -> Result<(), SessionError>;

    /// Computes semantic diagnostics for `file`
    async fn semantic_diagnostics_sync(
        &self,
        file: &Path,
    ) -> Result<Option<Vec<Diagnostic>>, SessionError>;

    /// Lists the error codes the service can fix, as decimal strings
    async fn supported_code_fixes(&self) -> Result<Option<Vec<String>>, SessionError>;

    /// Requests fixes for the given error codes over a span
    async fn code_fixes(
        &self,
        args: CodeFixRequestArgs,
    ) -> Result<Option<Vec<CodeFixAction>>, SessionError>;
}
