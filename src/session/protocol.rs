//! Request and response shapes of the tsserver protocol subset used here
//!
//! Lines and offsets are 1-based, as tsserver reports them.

use serde::{Deserialize, Serialize};

/// Commands issued to the analysis session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    NavTree,
    References,
    UpdateOpen,
    SemanticDiagnosticsSync,
    GetSupportedCodeFixes,
    GetCodeFixes,
}

impl Command {
    /// Returns the wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::NavTree => "navtree",
            Command::References => "references",
            Command::UpdateOpen => "updateOpen",
            Command::SemanticDiagnosticsSync => "semanticDiagnosticsSync",
            Command::GetSupportedCodeFixes => "getSupportedCodeFixes",
            Command::GetCodeFixes => "getCodeFixes",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in a file (1-based line and offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub offset: u32,
}

impl Location {
    pub fn new(line: u32, offset: u32) -> Self {
        Self { line, offset }
    }
}

/// A span between two locations, both inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: Location,
    pub end: Location,
}

impl TextSpan {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// Whether the span starts and ends on lines surrounding `line`
    pub fn contains_line(&self, line: u32) -> bool {
        self.start.line <= line && line <= self.end.line
    }

    pub fn contains(&self, location: Location) -> bool {
        self.start <= location && location <= self.end
    }

    pub fn intersects(&self, other: &TextSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequestArgs {
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocationRequestArgs {
    pub file: String,
    pub line: u32,
    pub offset: u32,
}

/// Node of the navigation tree returned by `navtree`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTree {
    pub text: String,
    pub kind: String,
    #[serde(default)]
    pub kind_modifiers: String,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_span: Option<TextSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_items: Vec<NavigationTree>,
}

/// Body of a `references` response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencesResponseBody {
    pub refs: Vec<ReferenceEntry>,
    #[serde(default)]
    pub symbol_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub file: String,
    pub start: Location,
    pub end: Location,
    #[serde(default)]
    pub is_definition: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequestArgs {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root_path: Option<String>,
}

/// Arguments of `updateOpen`; empty lists are left off the wire
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOpenArgs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_files: Vec<OpenRequestArgs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closed_files: Vec<String>,
}

impl UpdateOpenArgs {
    pub fn open(open_files: Vec<OpenRequestArgs>) -> Self {
        Self {
            open_files,
            closed_files: Vec::new(),
        }
    }

    pub fn close(closed_files: Vec<String>) -> Self {
        Self {
            open_files: Vec::new(),
            closed_files,
        }
    }
}

/// A diagnostic as reported by `semanticDiagnosticsSync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub start: Location,
    pub end: Location,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default)]
    pub category: String,
}

impl Diagnostic {
    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFixRequestArgs {
    pub file: String,
    pub start_line: u32,
    pub start_offset: u32,
    pub end_line: u32,
    pub end_offset: u32,
    pub error_codes: Vec<i32>,
}

/// A code action returned by `getCodeFixes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFixAction {
    #[serde(default)]
    pub fix_name: String,
    pub description: String,
    pub changes: Vec<FileCodeEdits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCodeEdits {
    pub file_name: String,
    pub text_changes: Vec<CodeEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEdit {
    pub start: Location,
    pub end: Location,
    pub new_text: String,
}

/// Outgoing request envelope
#[derive(Debug, Serialize)]
pub(crate) struct RequestMessage<'a, A> {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<A>,
}

/// Incoming message envelope (responses and events share it)
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub request_seq: Option<u64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}
