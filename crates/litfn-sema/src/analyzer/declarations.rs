use litfn_base::{Diagnostic, DiagnosticKind};
use litfn_syntax::ast::{
    Declaration, Designator, Expr, FunctionDef, Initializer, IntrospectOperand, StorageClass,
    TypeName, UnaryOp,
};
use litfn_syntax::types::{
    ArrayLen, BasicType, CType, FunctionType, ParamDecl, QualType, TagBody, TagSpec,
    TypeofOperand,
};

use super::{Access, Analyzer};
use crate::capture::Usage;
use crate::dedup::Symbol;
use crate::scope::{new_declaration, DeclKind, FrameKind, ScopeKind, Storage};

impl Analyzer {
    pub(super) fn function_definition(&mut self, def: &FunctionDef) {
        let file_scope = self.tree.file_scope();
        let file_frame = self.tree.file_frame();
        self.scope = file_scope;
        self.frame = file_frame;
        self.walk_type(&def.signature.ret, false);

        let is_static = def.specifiers.has_storage(StorageClass::Static);
        let mut decl = new_declaration(
            &def.name.name,
            QualType::new(CType::Function(def.signature.clone())),
            DeclKind::Function,
            Storage::None,
            def.name.span,
        );
        decl.external_linkage = !is_static;
        let id = self.tree.declare(file_scope, decl);
        self.record(&def.name, Symbol::Decl(id));

        let frame = self
            .tree
            .push_frame(FrameKind::Function, file_frame, def.name.name.clone());
        self.frame = frame;
        let params = self.tree.push_scope(file_scope, ScopeKind::Parameters, frame);
        self.scope = params;
        self.parameters(&def.signature.params, true);
        self.collect_labels(&def.body.stmts, frame);
        self.scope = self.tree.push_scope(params, ScopeKind::Block, frame);
        self.statements(&def.body.stmts);

        self.scope = file_scope;
        self.frame = file_frame;
    }

    /// Declares parameters in the current scope. With `walk_types` set their types are processed
    /// here too, so tags and array lengths in them belong to this parameter list.
    pub(super) fn parameters(&mut self, params: &[ParamDecl], walk_types: bool) {
        for param in params {
            if walk_types {
                self.walk_type(&param.ty, false);
            }
            let Some(name) = &param.name else {
                continue;
            };
            let adjusted = param.ty.adjust_parameter();
            let mut decl = new_declaration(
                &name.name,
                adjusted.clone(),
                DeclKind::Object,
                Storage::Automatic,
                name.span,
            );
            decl.is_register = param.is_register;
            decl.is_constant = param.is_register && adjusted.quals.is_const;
            decl.vm = self.is_vm(&adjusted);
            let id = self.tree.declare(self.scope, decl);
            self.record(name, Symbol::Decl(id));
        }
    }

    pub(super) fn declaration(&mut self, decl: &Declaration) {
        let specifiers = &decl.specifiers;
        let base = &specifiers.base;
        let is_typedef = specifiers.has_storage(StorageClass::Typedef);
        let is_extern = specifiers.has_storage(StorageClass::Extern);
        let standalone_tag = decl.declarators.is_empty();
        let needs_complete = !is_typedef
            && !is_extern
            && decl
                .declarators
                .iter()
                .any(|declarator| requires_complete(&declarator.ty, base));
        self.walk_base(base, needs_complete, standalone_tag);

        for declarator in &decl.declarators {
            self.walk_derived(&declarator.ty, base);
            let is_function = declarator.ty.is_function();
            let (kind, storage) = if is_typedef {
                (DeclKind::Typedef, Storage::None)
            } else if is_function {
                (DeclKind::Function, Storage::None)
            } else if specifiers.has_storage(StorageClass::ThreadLocal) {
                (DeclKind::Object, Storage::Thread)
            } else if is_extern
                || specifiers.has_storage(StorageClass::Static)
                || self.in_file_scope()
            {
                (DeclKind::Object, Storage::Static)
            } else {
                (DeclKind::Object, Storage::Automatic)
            };

            let mut entry = new_declaration(
                &declarator.name.name,
                declarator.ty.clone(),
                kind,
                storage,
                declarator.name.span,
            );
            let is_const = declarator.ty.strip_typedefs().quals.is_const;
            entry.is_constexpr = specifiers.has_storage(StorageClass::Constexpr);
            entry.is_register = specifiers.has_storage(StorageClass::Register);
            entry.is_constant = entry.is_constexpr || (entry.is_register && is_const);
            entry.vm = self.is_vm(&declarator.ty);
            let is_static = specifiers.has_storage(StorageClass::Static);
            entry.external_linkage = match kind {
                DeclKind::Function => !is_static,
                DeclKind::Object => is_extern || (self.in_file_scope() && !is_static),
                DeclKind::EnumConstant | DeclKind::Typedef => false,
            };
            let id = self.tree.declare(self.scope, entry);
            self.record(&declarator.name, Symbol::Decl(id));

            if let Some(init) = &declarator.init {
                self.initializer(init);
            }
        }
    }

    pub(super) fn initializer(&mut self, init: &Initializer) {
        match init {
            Initializer::Expr(expr) => self.expr(expr, Access::Value),
            Initializer::List { items, .. } => {
                for item in items {
                    for designator in &item.designators {
                        if let Designator::Index(index) = designator {
                            self.expr(index, Access::Value);
                        }
                    }
                    self.initializer(&item.value);
                }
            }
        }
    }

    pub(super) fn type_name(&mut self, type_name: &TypeName) {
        let needs_complete = requires_complete(&type_name.ty, &type_name.specifiers.base);
        self.walk_type(&type_name.ty, needs_complete);
    }

    fn walk_base(&mut self, base: &QualType, needs_complete: bool, standalone: bool) {
        match &base.ty {
            CType::Tag(tag) => self.tag_spec(tag, needs_complete, standalone),
            _ => self.walk_type(base, needs_complete),
        }
    }

    /// Walks the derivations a declarator added on top of `base`, stopping at `base` itself.
    fn walk_derived(&mut self, ty: &QualType, base: &QualType) {
        if ty == base {
            return;
        }
        match &ty.ty {
            CType::Pointer(pointee) => self.walk_derived(pointee, base),
            CType::Array { elem, len } => {
                self.walk_derived(elem, base);
                self.array_len(len);
            }
            CType::Function(function) => {
                self.walk_derived(&function.ret, base);
                self.prototype(function);
            }
            _ => self.walk_type(ty, false),
        }
    }

    /// Walks every part of `ty`. `needs_complete` is set where an object of the type is created.
    pub(super) fn walk_type(&mut self, ty: &QualType, needs_complete: bool) {
        match &ty.ty {
            CType::Void | CType::Basic(_) | CType::Error => {}
            CType::Pointer(pointee) => self.walk_type(pointee, false),
            CType::Array { elem, len } => {
                self.walk_type(elem, needs_complete);
                self.array_len(len);
            }
            CType::Function(function) => {
                self.walk_type(&function.ret, false);
                self.prototype(function);
            }
            CType::Tag(tag) => self.tag_spec(tag, needs_complete, false),
            CType::Typedef { name, target } => {
                if target.is_none() {
                    // Reported as a type category error by the parser.
                    return;
                }
                match self.tree.lookup(self.scope, &name.name) {
                    Some(id) if self.tree.decl(id).kind == DeclKind::Typedef => {
                        self.record(name, Symbol::Decl(id));
                        self.reference(id, name, Usage::SizeofOrTypeofOnly);
                    }
                    _ => self.undeclared(name, "type"),
                }
            }
            CType::Typeof { operand, .. } => {
                self.introspection += 1;
                match operand {
                    TypeofOperand::Expr(expr) => self.expr(expr, Access::Value),
                    TypeofOperand::Type(type_name) => self.type_name(type_name),
                }
                self.introspection -= 1;
            }
        }
    }

    fn array_len(&mut self, len: &ArrayLen) {
        if let ArrayLen::Expr(expr) = len {
            self.expr(expr, Access::Value);
        }
    }

    /// Parameter list of a function declarator that is not a definition. Its names and tags are
    /// confined to a prototype scope.
    fn prototype(&mut self, function: &FunctionType) {
        let saved = self.scope;
        self.scope = self
            .tree
            .push_scope(saved, ScopeKind::Parameters, self.frame);
        self.parameters(&function.params, true);
        self.scope = saved;
    }

    fn tag_spec(&mut self, tag: &TagSpec, needs_complete: bool, standalone: bool) {
        if let Some(id) = self.tree.seen_tag(tag.id) {
            if let Some(name) = &tag.name {
                self.record(name, Symbol::Tag(id));
            }
            return;
        }

        let id = match (&tag.name, &tag.body) {
            (Some(name), Some(_)) => {
                let existing = self
                    .tree
                    .local_tag(self.scope, &name.name)
                    .filter(|id| {
                        let entry = self.tree.tag(*id);
                        !entry.complete && entry.kind == tag.kind
                    });
                let id = match existing {
                    Some(id) => {
                        self.tree.complete_tag(id);
                        id
                    }
                    None => self
                        .tree
                        .declare_tag(self.scope, tag.kind, &name.name, true, name.span),
                };
                self.record(name, Symbol::Tag(id));
                Some(id)
            }
            (Some(name), None) => {
                let visible = if standalone {
                    self.tree.local_tag(self.scope, &name.name)
                } else {
                    self.tree.lookup_tag(self.scope, &name.name)
                };
                match visible {
                    Some(id) => {
                        self.record(name, Symbol::Tag(id));
                        Some(id)
                    }
                    None if needs_complete => {
                        self.emit(
                            Diagnostic::new(
                                DiagnosticKind::UndeclaredIdentifier,
                                format!(
                                    "`{} {}` is not declared in this scope",
                                    tag.kind.keyword(),
                                    name.name
                                ),
                                name.span,
                            )
                            .with_subject(name.name.clone()),
                        );
                        None
                    }
                    None => {
                        let id = self.tree.declare_tag(
                            self.scope,
                            tag.kind,
                            &name.name,
                            false,
                            name.span,
                        );
                        self.record(name, Symbol::Tag(id));
                        Some(id)
                    }
                }
            }
            (None, _) => None,
        };
        if let Some(id) = id {
            self.tree.mark_tag_seen(tag.id, id);
        }

        match &tag.body {
            Some(TagBody::Members(members)) => {
                for member in members {
                    self.walk_type(&member.ty, true);
                    if let Some(width) = &member.bit_width {
                        self.expr(width, Access::Value);
                    }
                }
            }
            Some(TagBody::Enumerators(enumerators)) => {
                for enumerator in enumerators {
                    if let Some(value) = &enumerator.value {
                        self.expr(value, Access::Value);
                    }
                    let mut decl = new_declaration(
                        &enumerator.name.name,
                        QualType::new(CType::Basic(BasicType::Int)),
                        DeclKind::EnumConstant,
                        Storage::None,
                        enumerator.name.span,
                    );
                    decl.is_constant = true;
                    let id = self.tree.declare(self.scope, decl);
                    self.record(&enumerator.name, Symbol::Decl(id));
                }
            }
            None => {}
        }
    }

    /// Whether `ty` has a runtime-dependent size somewhere in its derivation, judged from the
    /// current scope.
    pub(super) fn is_vm(&self, ty: &QualType) -> bool {
        match &ty.ty {
            CType::Array { elem, len } => {
                let runtime_len = match len {
                    ArrayLen::Unspecified => false,
                    ArrayLen::Star => true,
                    ArrayLen::Expr(expr) => !self.is_constant_expr(expr),
                };
                runtime_len || self.is_vm(elem)
            }
            CType::Pointer(pointee) => self.is_vm(pointee),
            CType::Function(function) => self.is_vm(&function.ret),
            CType::Typedef { name, .. } => self
                .tree
                .lookup(self.scope, &name.name)
                .map(|id| self.tree.decl(id))
                .is_some_and(|decl| decl.kind == DeclKind::Typedef && decl.vm),
            CType::Typeof { operand, .. } => match operand {
                TypeofOperand::Expr(expr) => self.expr_is_vm(expr),
                TypeofOperand::Type(type_name) => self.is_vm(&type_name.ty),
            },
            CType::Void | CType::Basic(_) | CType::Tag(_) | CType::Error => false,
        }
    }

    fn expr_is_vm(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(name) => self
                .tree
                .lookup(self.scope, &name.name)
                .is_some_and(|id| self.tree.decl(id).vm),
            Expr::Unary {
                op: UnaryOp::Deref | UnaryOp::AddrOf,
                operand,
                ..
            } => self.expr_is_vm(operand),
            Expr::Index { base, .. } => self.expr_is_vm(base),
            Expr::Member { .. } => false,
            Expr::CompoundLiteral { ty, .. } | Expr::Cast { ty, .. } => self.is_vm(&ty.ty),
            _ => false,
        }
    }

    /// Integer constant expressions, as far as array bounds need them.
    pub(super) fn is_constant_expr(&self, expr: &Expr) -> bool {
        match expr {
            Expr::IntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::CharLit { .. }
            | Expr::Bool { .. }
            | Expr::Nullptr(_) => true,
            Expr::Ident(name) => self
                .tree
                .lookup(self.scope, &name.name)
                .map(|id| self.tree.decl(id))
                .is_some_and(|decl| decl.kind == DeclKind::EnumConstant || decl.is_constexpr),
            Expr::Unary { op, operand, .. } => {
                matches!(
                    op,
                    UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot
                ) && self.is_constant_expr(operand)
            }
            Expr::Binary { left, right, .. } => {
                self.is_constant_expr(left) && self.is_constant_expr(right)
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                self.is_constant_expr(cond)
                    && self.is_constant_expr(then_expr)
                    && self.is_constant_expr(else_expr)
            }
            Expr::Cast { ty, expr, .. } => !self.is_vm(&ty.ty) && self.is_constant_expr(expr),
            Expr::Introspect { operand, .. } => match operand {
                IntrospectOperand::Type(type_name) => !self.is_vm(&type_name.ty),
                IntrospectOperand::Expr(expr) => !self.expr_is_vm(expr),
            },
            _ => false,
        }
    }
}

/// Whether an object declared with type `ty` needs `base` to be complete: `base` is reached
/// through array derivations only.
fn requires_complete(ty: &QualType, base: &QualType) -> bool {
    if ty == base {
        return true;
    }
    match &ty.ty {
        CType::Array { elem, .. } => requires_complete(elem, base),
        _ => false,
    }
}
