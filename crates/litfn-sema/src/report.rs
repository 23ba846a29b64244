use litfn_base::{file_diagnostics_have_errors, FileDiagnostic, Span};
use litfn_syntax::ast::NodeId;
use litfn_syntax::types::FunctionType;
use serde::Serialize;

use crate::capture::Usage;
use crate::dedup::{LiteralRef, UnitId};
use crate::scope::{DeclId, FrameId, ScopeId};

/// Identifier occurrence inside a literal-function body and how it is used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceUse {
    pub name: String,
    pub decl: DeclId,
    pub usage: Usage,
    /// Innermost literal function containing the occurrence.
    pub literal: NodeId,
    /// Whether the declaration lives outside that literal.
    pub crosses_boundary: bool,
    pub span: Span,
}

/// A literal function after scope construction and capture validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLiteral {
    pub id: NodeId,
    pub span: Span,
    pub signature: FunctionType,
    /// Value of `__func__` inside the body.
    pub func_name: String,
    pub enclosing_scope: ScopeId,
    pub param_scope: ScopeId,
    pub body_scope: ScopeId,
    pub frame: FrameId,
    /// No error was reported for the literal or anything nested in it.
    pub valid: bool,
    pub uses_func_name: bool,
    /// Alpha-renamed token signature; `None` when the literal may not be folded.
    pub instance_key: Option<String>,
    pub folded_into: Option<LiteralRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub path: String,
    pub unit: UnitId,
    pub diagnostics: Vec<FileDiagnostic>,
    /// In source order.
    pub literals: Vec<ResolvedLiteral>,
    pub references: Vec<ReferenceUse>,
}

impl UnitReport {
    pub fn has_errors(&self) -> bool {
        file_diagnostics_have_errors(&self.diagnostics)
    }

    pub fn literal(&self, id: NodeId) -> Option<&ResolvedLiteral> {
        self.literals.iter().find(|literal| literal.id == id)
    }
}
