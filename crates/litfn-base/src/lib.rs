#![deny(clippy::unwrap_used)]

mod diagnostics;
mod render;


pub use diagnostics::{
    file_diagnostics_have_errors, has_errors, Diagnostic, DiagnosticKind, DiagnosticLabel,
    DiagnosticSeverity, FileDiagnostic, Position, Span, SpannedName,
};
pub use render::{render_diagnostic_summary, render_diagnostics};
