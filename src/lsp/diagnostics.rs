//! Conversion between tsserver and LSP positions and diagnostics
//!
//! tsserver counts lines and offsets from 1, LSP from 0. Both count
//! characters in UTF-16 code units, so only the base differs.

use tower_lsp::lsp_types::{
    Diagnostic as LspDiagnostic, DiagnosticSeverity, NumberOrString, Position, Range,
};

use crate::session::protocol::{Diagnostic, Location, TextSpan};

const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

pub fn to_lsp_position(location: Location) -> Position {
    Position {
        line: location.line.saturating_sub(1),
        character: location.offset.saturating_sub(1),
    }
}

pub fn to_location(position: Position) -> Location {
    Location::new(position.line + 1, position.character + 1)
}

pub fn to_lsp_range(span: &TextSpan) -> Range {
    Range {
        start: to_lsp_position(span.start),
        end: to_lsp_position(span.end),
    }
}

pub fn to_text_span(range: &Range) -> TextSpan {
    TextSpan::new(to_location(range.start), to_location(range.end))
}

/// Create an LSP diagnostic from a stored tsserver diagnostic
pub fn to_lsp_diagnostic(diagnostic: &Diagnostic) -> LspDiagnostic {
    LspDiagnostic {
        range: to_lsp_range(&diagnostic.span()),
        severity: Some(severity(&diagnostic.category)),
        code: diagnostic.code.map(NumberOrString::Number),
        message: diagnostic.text.clone(),
        source: Some(PACKAGE_NAME.to_string()),
        ..Default::default()
    }
}

fn severity(category: &str) -> DiagnosticSeverity {
    match category {
        "warning" => DiagnosticSeverity::WARNING,
        "suggestion" => DiagnosticSeverity::HINT,
        "message" => DiagnosticSeverity::INFORMATION,
        _ => DiagnosticSeverity::ERROR,
    }
}
