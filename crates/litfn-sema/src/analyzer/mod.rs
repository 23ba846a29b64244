//! Scope construction and capture validation over a parsed translation unit.
//!
//! The analyzer walks the unit once, building the [`ScopeTree`] as declarations are reached, and
//! validates every literal function against the scope chain visible at its position.

mod declarations;
mod expressions;
mod literals;
mod statements;

use std::sync::Arc;

use litfn_base::{Diagnostic, DiagnosticKind, FileDiagnostic, Position, Span, SpannedName};
use litfn_syntax::ast::{ExternalDecl, LiteralFunctionExpr, NodeId, TranslationUnit};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::capture::{verdict, DeclClass, Usage, Verdict};
use crate::config::AnalysisConfig;
use crate::dedup::{fold_literals, InstanceTable, Symbol, UnitId};
use crate::report::{ReferenceUse, ResolvedLiteral, UnitReport};
use crate::scope::{DeclId, FrameId, FrameKind, ScopeId, ScopeTree};
use crate::suggest::closest_name;

/// Deepest statement and expression nesting the walk follows. Trees from
/// [`litfn_syntax::parse_unit`] stay within it; hand-built trees may not.
const MAX_WALK_DEPTH: u32 = 384;

/// Levels charged for entering a literal function body.
const LITERAL_WALK_COST: u32 = 8;

/// How the surrounding expression uses the value of a subexpression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Value context; array objects decay to a pointer.
    Value,
    /// Base of `a[i]` or `s.m`; reads the object without taking its address.
    Element,
    Write,
    AddressOf,
    Call,
}

/// Literal function being analysed.
#[derive(Debug)]
struct OpenLiteral {
    id: NodeId,
    frame: FrameId,
    uses_func_name: bool,
}

pub struct Analyzer {
    config: AnalysisConfig,
    table: Arc<InstanceTable>,
    unit: UnitId,
    path: String,
    tree: ScopeTree,
    scope: ScopeId,
    frame: FrameId,
    /// Depth of `sizeof`, `alignof` and `typeof` operands around the current position.
    introspection: u32,
    depth: u32,
    truncated: bool,
    open_literals: Vec<OpenLiteral>,
    literal_count: u32,
    symbols: FxHashMap<Position, Symbol>,
    diagnostics: Vec<Diagnostic>,
    literals: Vec<ResolvedLiteral>,
    references: Vec<ReferenceUse>,
    fold_on_finish: bool,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig, table: Arc<InstanceTable>) -> Self {
        let unit = table.register_unit();
        Self::with_unit(config, table, unit)
    }

    /// Analyzer for a unit id already allocated from `table`.
    pub fn with_unit(config: AnalysisConfig, table: Arc<InstanceTable>, unit: UnitId) -> Self {
        let tree = ScopeTree::new();
        let scope = tree.file_scope();
        let frame = tree.file_frame();
        Self {
            config,
            table,
            unit,
            path: String::from("<input>"),
            tree,
            scope,
            frame,
            introspection: 0,
            depth: 0,
            truncated: false,
            open_literals: Vec::new(),
            literal_count: 0,
            symbols: FxHashMap::default(),
            diagnostics: Vec::new(),
            literals: Vec::new(),
            references: Vec::new(),
            fold_on_finish: true,
        }
    }

    /// Leaves folding to the caller, which then folds units in an order of its choosing.
    pub(crate) fn defer_folding(mut self) -> Self {
        self.fold_on_finish = false;
        self
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.tree
    }

    /// Scope tree for hosts that build the enclosing chain of a literal themselves.
    pub fn scopes_mut(&mut self) -> &mut ScopeTree {
        &mut self.tree
    }

    #[instrument(skip_all, fields(path = %unit.path))]
    pub fn analyze_unit(mut self, unit: &TranslationUnit) -> UnitReport {
        self.path = unit.path.clone();
        for item in &unit.items {
            match item {
                ExternalDecl::Function(def) => self.function_definition(def),
                ExternalDecl::Declaration(decl) => self.declaration(decl),
            }
        }
        self.finish()
    }

    /// Validates one literal function whose enclosing scope is `enclosing`. The literal's
    /// type-name is classified against the scope chain first, since it did not come through
    /// [`litfn_syntax::parse_unit`].
    pub fn analyze_literal(
        &mut self,
        literal: &LiteralFunctionExpr,
        enclosing: ScopeId,
    ) -> ResolvedLiteral {
        let saved = (self.scope, self.frame);
        self.scope = enclosing;
        self.frame = self.tree.scope(enclosing).frame;
        let resolved = self.literal_function(literal, true);
        (self.scope, self.frame) = saved;
        resolved
    }

    pub fn finish(mut self) -> UnitReport {
        self.literals.sort_by_key(|literal| literal.span.start);
        if self.config.deduplicate && self.fold_on_finish {
            fold_literals(&self.table, self.unit, &mut self.literals);
        }
        let path = self.path;
        let diagnostics = self
            .diagnostics
            .into_iter()
            .map(|diagnostic| FileDiagnostic {
                path: path.clone(),
                diagnostic,
            })
            .collect();
        UnitReport {
            path,
            unit: self.unit,
            diagnostics,
            literals: self.literals,
            references: self.references,
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Enters `levels` of nesting at `span`; past [`MAX_WALK_DEPTH`] the subtree is skipped and
    /// reported once per unit.
    fn descend(&mut self, levels: u32, span: Span) -> bool {
        if self.depth + levels > MAX_WALK_DEPTH {
            if !self.truncated {
                self.truncated = true;
                self.emit(Diagnostic::new(
                    DiagnosticKind::Syntax,
                    "nesting is too deep",
                    span,
                ));
            }
            return false;
        }
        self.depth += levels;
        true
    }

    fn ascend(&mut self, levels: u32) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn in_file_scope(&self) -> bool {
        self.scope == self.tree.file_scope()
    }

    fn record(&mut self, name: &SpannedName, symbol: Symbol) {
        self.symbols.insert(name.span.start, symbol);
    }

    fn undeclared(&mut self, name: &SpannedName, what: &str) {
        let mut diag = Diagnostic::new(
            DiagnosticKind::UndeclaredIdentifier,
            format!("{what} `{}` is not declared in this scope", name.name),
            name.span,
        )
        .with_subject(name.name.clone());
        if self.config.suggestions {
            let visible = self.tree.visible_names(self.scope);
            let suggestion = closest_name(&name.name, visible).map(str::to_string);
            if let Some(suggestion) = suggestion {
                if let Some(id) = self.tree.lookup(self.scope, &suggestion) {
                    let span = self.tree.decl(id).span;
                    diag = diag.with_label(format!("did you mean `{suggestion}`?"), span);
                }
            }
        }
        self.emit(diag);
    }

    /// Records a use of `id` and checks it against the capture rules when it crosses the
    /// boundary of the innermost literal function.
    fn reference(&mut self, id: DeclId, name: &SpannedName, usage: Usage) {
        let Some(literal) = self.open_literals.last() else {
            return;
        };
        let literal_id = literal.id;
        let decl = self.tree.decl(id);
        let crosses =
            decl.frame != self.frame && self.tree.frame(self.frame).kind == FrameKind::Literal;
        self.references.push(ReferenceUse {
            name: name.name.clone(),
            decl: id,
            usage,
            literal: literal_id,
            crosses_boundary: crosses,
            span: name.span,
        });
        if !crosses {
            return;
        }

        let decl_span = decl.span;
        if decl.vm {
            debug!(name = %name.name, "reference to variably modified declaration");
            let diag = Diagnostic::new(
                DiagnosticKind::IllegalCapture,
                format!(
                    "`{}` has a variably modified type and cannot be used inside a literal function",
                    name.name
                ),
                name.span,
            )
            .with_subject(name.name.clone())
            .with_label("declared here", decl_span);
            self.emit(diag);
            return;
        }

        let class = DeclClass::of(decl);
        let outcome = verdict(class, usage, self.config.register_constant_policy);
        debug!(name = %name.name, ?class, ?usage, ?outcome, "capture check");
        match outcome {
            Verdict::Allow => {}
            Verdict::Warn => {
                let diag = Diagnostic::new(
                    DiagnosticKind::RegisterConstantCapture,
                    format!(
                        "use of `register` constant `{}` inside a literal function is currently unspecified",
                        name.name
                    ),
                    name.span,
                )
                .with_subject(name.name.clone())
                .with_label("declared here", decl_span);
                self.emit(diag);
            }
            Verdict::Deny => {
                let diag = Diagnostic::new(
                    DiagnosticKind::IllegalCapture,
                    format!(
                        "literal function cannot capture `{}` from the enclosing function (usage: {})",
                        name.name,
                        usage.describe()
                    ),
                    name.span,
                )
                .with_subject(name.name.clone())
                .with_label("declared here", decl_span);
                self.emit(diag);
            }
        }
    }

    fn func_name(&mut self, span: Span) {
        if self.tree.frame(self.frame).kind == FrameKind::File {
            self.emit(
                Diagnostic::new(
                    DiagnosticKind::UndeclaredIdentifier,
                    "`__func__` is only defined inside a function body",
                    span,
                )
                .with_subject("__func__"),
            );
            return;
        }
        for literal in &mut self.open_literals {
            literal.uses_func_name = true;
        }
    }
}
