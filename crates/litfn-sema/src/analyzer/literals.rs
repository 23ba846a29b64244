use litfn_base::{has_errors, Diagnostic, DiagnosticKind};
use litfn_syntax::ast::LiteralFunctionExpr;
use litfn_syntax::{disambiguate, unsupported_specifiers, Construct};
use tracing::debug;

use super::{Analyzer, OpenLiteral, LITERAL_WALK_COST};
use crate::dedup::instance_key;
use crate::report::ResolvedLiteral;
use crate::scope::{FrameId, FrameKind, ScopeKind, Storage};

impl Analyzer {
    /// Builds the parameter and body scopes of `literal` under the current scope and validates
    /// its body. With `classify` set the type-name is disambiguated here and its diagnostics
    /// reported; otherwise the parser has already done so.
    pub(super) fn literal_function(
        &mut self,
        literal: &LiteralFunctionExpr,
        classify: bool,
    ) -> ResolvedLiteral {
        let enclosing = self.scope;
        let enclosing_frame = self.frame;
        let first_diagnostic = self.diagnostics.len();

        if classify {
            self.classify_literal(literal);
        }

        self.literal_count += 1;
        let func_name = format!(
            "{}.literal.{}",
            self.tree.frame(enclosing_frame).func_name,
            self.literal_count
        );
        let frame = self
            .tree
            .push_frame(FrameKind::Literal, enclosing_frame, func_name.clone());
        debug!(literal = literal.id.0, %func_name, "literal function");
        self.frame = frame;
        // The body is a function definition even under `sizeof` or `typeof`.
        let introspection = std::mem::take(&mut self.introspection);
        self.open_literals.push(OpenLiteral {
            id: literal.id,
            frame,
            uses_func_name: false,
        });

        // The return type is written in the enclosing scope, so its tags are declared there and
        // stay visible after the expression.
        let inline_signature = literal.has_inline_signature();
        if inline_signature {
            self.walk_type(&literal.signature.ret, false);
        } else {
            self.type_name(&literal.type_name);
        }

        let param_scope = self.tree.push_scope(enclosing, ScopeKind::Parameters, frame);
        self.scope = param_scope;
        self.parameters(&literal.signature.params, inline_signature);
        self.collect_labels(&literal.body.stmts, frame);
        let body_scope = self.tree.push_scope(param_scope, ScopeKind::Block, frame);
        self.scope = body_scope;
        let walked = self.descend(LITERAL_WALK_COST, literal.span);
        if walked {
            self.statements(&literal.body.stmts);
            self.ascend(LITERAL_WALK_COST);
        }

        let uses_func_name = self
            .open_literals
            .pop()
            .is_some_and(|open| open.uses_func_name);
        self.scope = enclosing;
        self.frame = enclosing_frame;
        self.introspection = introspection;

        let own_diagnostics = &self.diagnostics[first_diagnostic..];
        let specifiers_ok = unsupported_specifiers(&literal.type_name).is_empty();
        let valid = walked && specifiers_ok && !has_errors(own_diagnostics);
        let foldable = valid
            && own_diagnostics.is_empty()
            && !uses_func_name
            && !self.has_own_storage(frame);
        let key = foldable.then(|| {
            instance_key(&literal.tokens, &self.symbols, &self.tree, frame, self.unit)
        });
        debug!(literal = literal.id.0, valid, foldable, "literal function validated");

        let resolved = ResolvedLiteral {
            id: literal.id,
            span: literal.span,
            signature: literal.signature.clone(),
            func_name,
            enclosing_scope: enclosing,
            param_scope,
            body_scope,
            frame,
            valid,
            uses_func_name,
            instance_key: key,
            folded_into: None,
        };
        self.literals.push(resolved.clone());
        resolved
    }

    /// Whether a `static` or `thread_local` object is declared inside `frame`. Each instance of
    /// such a literal owns that object, so it cannot share an instance with another literal.
    fn has_own_storage(&self, frame: FrameId) -> bool {
        self.tree.decls().iter().any(|decl| {
            matches!(decl.storage, Storage::Static | Storage::Thread)
                && !decl.external_linkage
                && self.tree.frame_within(decl.frame, frame)
        })
    }

    fn classify_literal(&mut self, literal: &LiteralFunctionExpr) {
        let outcome = disambiguate(&literal.type_name, &self.tree.view(self.scope));
        debug!(literal = literal.id.0, ?outcome, "classified type-name");
        match outcome {
            Ok(Construct::LiteralFunction) => {}
            Ok(Construct::CompoundLiteral | Construct::Ambiguous) => {
                self.emit(Diagnostic::new(
                    DiagnosticKind::TypeCategoryError,
                    "type-name does not denote a function type in this scope",
                    literal.type_name.span,
                ));
            }
            Err(diagnostics) => {
                for diagnostic in diagnostics {
                    self.emit(diagnostic);
                }
            }
        }
    }
}
