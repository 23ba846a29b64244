use litfn_base::SpannedName;
use litfn_syntax::ast::{Expr, IntrospectOperand, UnaryOp};
use litfn_syntax::types::{CType, QualType};

use super::{Access, Analyzer};
use crate::capture::Usage;
use crate::dedup::Symbol;
use crate::scope::DeclKind;

impl Analyzer {
    pub(super) fn expr(&mut self, expr: &Expr, access: Access) {
        if !self.descend(1, expr.span()) {
            return;
        }
        self.expr_node(expr, access);
        self.ascend(1);
    }

    fn expr_node(&mut self, expr: &Expr, access: Access) {
        match expr {
            Expr::Ident(name) => self.identifier(name, access),
            Expr::IntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::CharLit { .. }
            | Expr::StringLit { .. }
            | Expr::Bool { .. }
            | Expr::Nullptr(_)
            | Expr::Error(_) => {}
            Expr::FuncName(span) => self.func_name(*span),
            Expr::Unary { op, operand, .. } => {
                let access = match op {
                    UnaryOp::AddrOf => Access::AddressOf,
                    UnaryOp::PreInc | UnaryOp::PreDec => Access::Write,
                    _ => Access::Value,
                };
                self.expr(operand, access);
            }
            Expr::Postfix { operand, .. } => self.expr(operand, Access::Write),
            Expr::Binary { left, right, .. } | Expr::Comma { left, right, .. } => {
                self.expr(left, Access::Value);
                self.expr(right, Access::Value);
            }
            Expr::Assign { target, value, .. } => {
                self.expr(target, Access::Write);
                self.expr(value, Access::Value);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                self.expr(cond, Access::Value);
                self.expr(then_expr, Access::Value);
                self.expr(else_expr, Access::Value);
            }
            Expr::Call { callee, args, .. } => {
                let access = match callee.as_ref() {
                    Expr::Ident(_) => Access::Call,
                    _ => Access::Value,
                };
                self.expr(callee, access);
                for arg in args {
                    self.expr(arg, Access::Value);
                }
            }
            Expr::Index { base, index, .. } => {
                let base_access = if self.array_type_of(base).is_some() {
                    propagate(access)
                } else {
                    Access::Value
                };
                self.expr(base, base_access);
                self.expr(index, Access::Value);
            }
            Expr::Member { base, arrow, .. } => {
                let base_access = if *arrow {
                    Access::Value
                } else {
                    propagate(access)
                };
                self.expr(base, base_access);
            }
            Expr::Cast { ty, expr, .. } => {
                self.type_name(ty);
                self.expr(expr, Access::Value);
            }
            Expr::Introspect { operand, .. } => {
                self.introspection += 1;
                match operand {
                    IntrospectOperand::Expr(expr) => self.expr(expr, Access::Value),
                    IntrospectOperand::Type(type_name) => self.type_name(type_name),
                }
                self.introspection -= 1;
            }
            Expr::CompoundLiteral { ty, init, .. } => {
                self.type_name(ty);
                self.initializer(init);
            }
            Expr::LiteralFunction(literal) => {
                self.literal_function(literal, false);
            }
        }
    }

    fn identifier(&mut self, name: &SpannedName, access: Access) {
        let Some(id) = self.tree.lookup(self.scope, &name.name) else {
            self.undeclared(name, "identifier");
            return;
        };
        self.record(name, Symbol::Decl(id));
        let decl = self.tree.decl(id);
        let usage = if self.introspection > 0 {
            Usage::SizeofOrTypeofOnly
        } else {
            match access {
                Access::Value if decl.kind == DeclKind::Object && decl.ty.is_array() => {
                    Usage::AddressOf
                }
                Access::Value | Access::Element => Usage::Read,
                Access::Write => Usage::Write,
                Access::AddressOf => Usage::AddressOf,
                Access::Call => Usage::Call,
            }
        };
        self.reference(id, name, usage);
    }

    /// Array type of an expression that designates an array object, when it can be told from
    /// declarations alone.
    fn array_type_of(&self, expr: &Expr) -> Option<QualType> {
        let ty = match expr {
            Expr::Ident(name) => {
                let decl = self.tree.decl(self.tree.lookup(self.scope, &name.name)?);
                (decl.kind == DeclKind::Object).then(|| decl.ty.strip_typedefs())?
            }
            Expr::Index { base, .. } => match self.array_type_of(base)?.ty {
                CType::Array { elem, .. } => elem.strip_typedefs(),
                _ => return None,
            },
            Expr::CompoundLiteral { ty, .. } => ty.ty.strip_typedefs(),
            _ => return None,
        };
        matches!(ty.ty, CType::Array { .. }).then_some(ty)
    }
}

/// Writes and address-of pass through `.` and array indexing to the object; other uses read it.
fn propagate(access: Access) -> Access {
    match access {
        Access::Write | Access::AddressOf => access,
        Access::Value | Access::Element | Access::Call => Access::Element,
    }
}
