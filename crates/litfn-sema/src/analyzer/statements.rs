use litfn_base::{Diagnostic, DiagnosticKind, SpannedName};
use litfn_syntax::ast::{ForInit, Stmt};

use super::{Access, Analyzer};
use crate::scope::{FrameId, ScopeKind};

impl Analyzer {
    pub(super) fn statements(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        if !self.descend(1, stmt.span()) {
            return;
        }
        self.statement_node(stmt);
        self.ascend(1);
    }

    fn statement_node(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Declaration(decl) => self.declaration(decl),
            Stmt::Expr { expr, .. } => self.expr(expr, Access::Value),
            Stmt::Block(block) => self.in_block_scope(|this| this.statements(&block.stmts)),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(cond, Access::Value);
                self.statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch);
                }
            }
            Stmt::While { cond, body, .. } | Stmt::Switch { cond, body, .. } => {
                self.expr(cond, Access::Value);
                self.statement(body);
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.statement(body);
                self.expr(cond, Access::Value);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => self.in_block_scope(|this| {
                match init {
                    Some(ForInit::Declaration(decl)) => this.declaration(decl),
                    Some(ForInit::Expr(expr)) => this.expr(expr, Access::Value),
                    None => {}
                }
                if let Some(cond) = cond {
                    this.expr(cond, Access::Value);
                }
                if let Some(step) = step {
                    this.expr(step, Access::Value);
                }
                this.statement(body);
            }),
            Stmt::Case { value, body, .. } => {
                self.expr(value, Access::Value);
                self.statement(body);
            }
            Stmt::Default { body, .. } | Stmt::Labeled { body, .. } => self.statement(body),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value, Access::Value);
                }
            }
            Stmt::Goto { label, .. } => self.goto(label),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
        }
    }

    fn in_block_scope(&mut self, body: impl FnOnce(&mut Self)) {
        let saved = self.scope;
        self.scope = self.tree.push_scope(saved, ScopeKind::Block, self.frame);
        body(self);
        self.scope = saved;
    }

    /// Records the labels of a function body in `frame`. Expressions are not entered, so labels
    /// inside nested literal functions stay with those literals.
    pub(super) fn collect_labels(&mut self, stmts: &[Stmt], frame: FrameId) {
        let mut pending: Vec<&Stmt> = stmts.iter().rev().collect();
        while let Some(stmt) = pending.pop() {
            match stmt {
                Stmt::Labeled { label, body, .. } => {
                    self.tree
                        .frame_mut(frame)
                        .labels
                        .entry(label.name.clone())
                        .or_insert(label.span);
                    pending.push(body.as_ref());
                }
                Stmt::Block(block) => pending.extend(block.stmts.iter().rev()),
                Stmt::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    if let Some(else_branch) = else_branch {
                        pending.push(else_branch.as_ref());
                    }
                    pending.push(then_branch.as_ref());
                }
                Stmt::While { body, .. }
                | Stmt::DoWhile { body, .. }
                | Stmt::For { body, .. }
                | Stmt::Switch { body, .. }
                | Stmt::Case { body, .. }
                | Stmt::Default { body, .. } => pending.push(body.as_ref()),
                Stmt::Declaration(_)
                | Stmt::Expr { .. }
                | Stmt::Return { .. }
                | Stmt::Break(_)
                | Stmt::Continue(_)
                | Stmt::Goto { .. }
                | Stmt::Empty(_) => {}
            }
        }
    }

    /// Labels are never looked up outside the current function or literal function.
    fn goto(&mut self, label: &SpannedName) {
        if self.tree.frame(self.frame).labels.contains_key(&label.name) {
            return;
        }
        let mut diag = Diagnostic::new(
            DiagnosticKind::UndefinedLabel,
            format!("label `{}` is not defined in this function", label.name),
            label.span,
        )
        .with_subject(label.name.clone());
        let outer = self
            .tree
            .frame_ancestors(self.frame)
            .skip(1)
            .find_map(|frame| self.tree.frame(frame).labels.get(&label.name).copied());
        if let Some(span) = outer {
            diag = diag.with_label(
                "a label with this name belongs to an enclosing function and is not visible inside a literal function",
                span,
            );
        }
        self.emit(diag);
    }
}
